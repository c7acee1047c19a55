mod common;

use brewscale_core::{FilterSelector, FilterState, SampleHistory, SelectorParams, Transition};
use common::connected;
use proptest::prelude::*;

const PARAMS: SelectorParams = SelectorParams {
    brewing_threshold: 0.15,
    stability_timeout_ms: 2000,
    settle_multiplier: 2,
};

prop_compose! {
    // Loads in counts above the tare point, each read past the sample interval.
    fn pour_strategy()(
        steps in prop::collection::vec((0i32..4000, 20u64..300), 1..120)
    ) -> Vec<(i32, u64)> {
        steps
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn filtered_weight_stays_within_observed_readings(pour in pour_strategy()) {
        let mut r = connected(1, 200.0);
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for (counts, gap) in pour {
            r.load(0, counts);
            r.clock.advance_ms(gap);
            let grams = counts as f32 / 200.0;
            lo = lo.min(grams);
            hi = hi.max(grams);
            let w = r.scale.get_filtered_weight();
            prop_assert!(w.is_finite());
            prop_assert!(w >= lo - 1e-3 && w <= hi + 1e-3, "w={w} lo={lo} hi={hi}");
        }
    }

    #[test]
    fn dual_reading_is_sum_of_channels(c1 in -50_000i32..50_000, c2 in -50_000i32..50_000) {
        let mut r = connected(2, 1000.0);
        r.load(0, c1);
        r.load(1, c2);
        let expected = (f64::from(c1) / 1000.0) as f32 + (f64::from(c2) / 1000.0) as f32;
        prop_assert_eq!(r.read(), expected);
        prop_assert_eq!(r.scale.try_raw_fused().unwrap(), i64::from(c1) + i64::from(c2) + 16_000);
    }

    #[test]
    fn selector_transitions_are_consistent(
        steps in prop::collection::vec((0.0f32..1.0, 0u64..3000), 1..200)
    ) {
        let mut sel = FilterSelector::new();
        let mut now = 0u64;
        for (delta, dt) in steps {
            now += dt;
            let before = sel.state();
            let last_activity = sel.last_activity_ms();
            let t = sel.step(delta, now, &PARAMS);
            prop_assert_eq!(sel.state(), t.target());
            prop_assert!(sel.last_activity_ms() >= last_activity);
            if delta > PARAMS.brewing_threshold {
                prop_assert_eq!(sel.state(), FilterState::Brewing);
                prop_assert_eq!(sel.last_activity_ms(), now);
            }
            match (before, sel.state()) {
                (FilterState::Stable, FilterState::Transitioning) => {
                    prop_assert!(false, "STABLE never skips to TRANSITIONING");
                }
                (FilterState::Transitioning, FilterState::Stable) => {
                    prop_assert_eq!(t, Transition::Settled);
                    prop_assert!(now - sel.last_activity_ms() > 4000);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn median_and_average_come_from_the_window(
        values in prop::collection::vec(-1000.0f32..1000.0, 1..30),
        n in 1usize..=10,
    ) {
        let mut h: SampleHistory = SampleHistory::new();
        h.initialize(values[0]);
        for v in &values[1..] {
            h.push(*v);
        }
        let window: Vec<f32> = (0..n).map(|i| h.recent(i)).collect();
        let lo = window.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let m = h.median(n);
        prop_assert!(window.contains(&m));
        let a = h.average(n);
        prop_assert!(a >= lo - 1e-2 && a <= hi + 1e-2);
    }
}
