mod common;

use brewscale_core::tuning::{
    KEY_AVERAGE_SAMPLES, KEY_BREWING_THRESHOLD, KEY_MEDIAN_SAMPLES, KEY_STABILITY_TIMEOUT,
};
use brewscale_core::{LoadCellClass, MAX_SAMPLES, TuningParameters};
use brewscale_hardware::MemoryStore;
use common::{connected, rig_with_store};
use rstest::rstest;

#[test]
fn threshold_outside_bounds_changes_and_writes_nothing() {
    let mut r = connected(1, 2000.0);
    let writes = r.store.writes();

    assert!(!r.scale.set_brewing_threshold(0.01));
    assert!(!r.scale.set_brewing_threshold(2.0));
    assert_eq!(r.scale.brewing_threshold(), 0.15);
    assert_eq!(r.store.writes(), writes);

    assert!(r.scale.set_brewing_threshold(0.2));
    assert_eq!(r.scale.brewing_threshold(), 0.2);
    // Every accepted change persists the whole tuning set.
    assert_eq!(r.store.writes(), writes + 4);
    assert_eq!(r.store.peek_f32("scale", KEY_BREWING_THRESHOLD), Some(0.2));
}

#[rstest]
#[case::below(499, false)]
#[case::min(500, true)]
#[case::max(10_000, true)]
#[case::above(10_001, false)]
fn stability_timeout_bounds(#[case] ms: u32, #[case] accepted: bool) {
    let mut r = connected(1, 2000.0);
    assert_eq!(r.scale.set_stability_timeout_ms(ms), accepted);
    let expected = if accepted { ms } else { 2000 };
    assert_eq!(r.scale.stability_timeout_ms(), expected);
}

#[rstest]
#[case::zero(0, false)]
#[case::one(1, true)]
#[case::full_buffer(MAX_SAMPLES, true)]
#[case::beyond_buffer(MAX_SAMPLES + 1, false)]
fn sample_count_bounds(#[case] n: usize, #[case] accepted: bool) {
    let mut r = connected(1, 2000.0);
    assert_eq!(r.scale.set_median_samples(n), accepted);
    assert_eq!(r.scale.set_average_samples(n), accepted);
    if accepted {
        assert_eq!(r.scale.median_samples(), n);
        assert_eq!(r.scale.average_samples(), n);
    } else {
        assert_eq!(r.scale.median_samples(), 3);
        assert_eq!(r.scale.average_samples(), 2);
    }
}

#[rstest]
#[case::low_capacity(800.0, LoadCellClass::LowCapacity, 0.25)]
#[case::negative_factor(-800.0, LoadCellClass::LowCapacity, 0.25)]
#[case::medium(2000.0, LoadCellClass::Medium, 0.15)]
#[case::high_sensitivity(5000.0, LoadCellClass::HighSensitivity, 0.1)]
fn first_boot_picks_threshold_from_factor(
    #[case] factor: f32,
    #[case] class: LoadCellClass,
    #[case] threshold: f32,
) {
    let r = connected(1, factor);
    assert_eq!(r.scale.detected_load_cell_class(), Some(class));
    assert_eq!(r.scale.brewing_threshold(), threshold);
    // Persisted immediately so the next boot keeps it.
    assert_eq!(r.store.writes(), 4);
    assert_eq!(
        r.store.peek_f32("scale", KEY_BREWING_THRESHOLD),
        Some(threshold)
    );
}

#[test]
fn second_boot_skips_heuristic() {
    let store = MemoryStore::new();
    let mut first = rig_with_store(1, 5000.0, store.clone());
    first.scale.initialize().unwrap();
    assert!(first.scale.set_brewing_threshold(0.5));
    let writes = store.writes();

    let mut second = rig_with_store(1, 5000.0, store.clone());
    second.scale.initialize().unwrap();
    assert_eq!(second.scale.detected_load_cell_class(), None);
    assert_eq!(second.scale.brewing_threshold(), 0.5);
    assert_eq!(store.writes(), writes);
}

#[test]
fn corrupt_stored_values_fall_back_to_defaults() {
    let store = MemoryStore::new();
    store.seed_f32("scale", KEY_BREWING_THRESHOLD, 3.0);
    store.seed_u32("scale", KEY_STABILITY_TIMEOUT, 60_000);
    store.seed_i32("scale", KEY_MEDIAN_SAMPLES, 0);
    store.seed_i32("scale", KEY_AVERAGE_SAMPLES, 7);
    let mut r = rig_with_store(1, 2000.0, store);
    r.scale.initialize().unwrap();

    assert_eq!(
        r.scale.tuning(),
        TuningParameters {
            average_samples: 7,
            ..TuningParameters::default()
        }
    );
    assert_eq!(r.scale.detected_load_cell_class(), None);
}

#[test]
fn tuning_takes_effect_on_next_reading() {
    let mut r = connected(1, 2000.0);
    r.load(0, 2000);
    assert_eq!(r.read(), 1.0);

    // 0.2 g steps no longer count as activity with a 0.25 g threshold.
    assert!(r.scale.set_brewing_threshold(0.25));
    r.load(0, 2400);
    r.read();
    assert_eq!(r.scale.filter_state_name(), "STABLE");

    assert!(r.scale.set_brewing_threshold(0.1));
    r.load(0, 2800);
    r.read();
    assert_eq!(r.scale.filter_state_name(), "BREWING");
}

#[test]
fn explicit_save_and_load_round_trip() {
    let mut r = connected(2, 1000.0);
    assert!(r.scale.set_stability_timeout_ms(3000));
    r.scale.save_tuning().unwrap();

    let mut other = rig_with_store(2, 1000.0, r.store.clone());
    other.scale.load_tuning();
    assert_eq!(other.scale.tuning(), r.scale.tuning());
    assert_eq!(other.scale.detected_load_cell_class(), None);
}
