mod common;

use brewscale_core::{FilterState, HealthStatus};
use common::{connected, rig};

#[test]
fn single_cell_small_changes_stay_stable() {
    let mut r = connected(1, 2000.0);
    assert_eq!(r.scale.brewing_threshold(), 0.15);
    assert_eq!(r.scale.average_samples(), 2);

    r.load(0, 2000);
    assert_eq!(r.read(), 1.0);
    for counts in [2010, 2005] {
        r.load(0, counts);
        let w = r.read();
        assert!((w - 1.0).abs() <= 0.02, "weight {w} drifted from 1.0 g");
    }
    assert_eq!(r.scale.filter_state(), FilterState::Stable);
    assert_eq!(r.scale.filter_state_name(), "STABLE");
}

#[test]
fn dual_cells_sum_and_detect_brewing() {
    let mut r = connected(2, 1000.0);
    r.bare_counts();
    assert!(r.scale.set_median_samples(1));

    r.load(0, 1000);
    r.load(1, 1000);
    assert_eq!(r.read(), 2.0);
    assert_eq!(r.scale.get_raw_fused(), 2000);

    r.load(1, 1500);
    assert_eq!(r.read(), 2.5);
    assert_eq!(r.scale.get_raw_fused(), 2500);
    assert_eq!(r.scale.filter_state(), FilterState::Brewing);
}

#[test]
fn brewing_median_rejects_first_sample_of_a_pour() {
    let mut r = connected(2, 1000.0);
    r.bare_counts();
    r.load(0, 1000);
    r.load(1, 1000);
    assert_eq!(r.read(), 2.0);

    r.load(1, 1500);
    assert_eq!(r.read(), 2.0);
    assert_eq!(r.scale.filter_state_name(), "BREWING");
}

#[test]
fn step_change_bypasses_filter_and_forces_brewing() {
    let mut r = connected(1, 2000.0);
    assert_eq!(r.read(), 0.0);
    assert_eq!(r.read(), 0.0);
    assert_eq!(r.scale.filter_state(), FilterState::Stable);

    r.load(0, 20_000);
    assert_eq!(r.read(), 10.0);
    assert_eq!(r.scale.filter_state(), FilterState::Brewing);

    // History was reseeded, so the median agrees immediately.
    assert_eq!(r.read(), 10.0);
}

#[test]
fn repeated_reads_inside_interval_are_identical() {
    let mut r = connected(1, 2000.0);
    r.load(0, 2000);
    let first = r.read();

    r.load(0, 40_000);
    r.clock.advance_ms(19);
    assert_eq!(r.scale.get_filtered_weight(), first);
    assert_eq!(r.scale.get_filtered_weight(), first);

    r.clock.advance_ms(1);
    assert_eq!(r.scale.get_filtered_weight(), 20.0);
}

#[test]
fn last_filtered_weight_never_acquires() {
    let mut r = connected(1, 2000.0);
    r.load(0, 6000);
    assert_eq!(r.read(), 3.0);
    let reads = r.cells[0].raw_reads();
    r.load(0, 0);
    r.clock.advance_ms(100);
    assert_eq!(r.scale.get_last_filtered_weight(), 3.0);
    assert_eq!(r.cells[0].raw_reads(), reads);
}

#[test]
fn quiet_period_walks_back_to_stable() {
    let mut r = connected(1, 2000.0);
    assert_eq!(r.scale.stability_timeout_ms(), 2000);
    r.read();

    r.load(0, 2000);
    r.read();
    r.read();
    assert_eq!(r.scale.filter_state(), FilterState::Brewing);
    let quiet_from = r.clock.elapsed();

    r.clock.set_offset(quiet_from + std::time::Duration::from_millis(1990));
    r.scale.get_filtered_weight();
    assert_eq!(r.scale.filter_state(), FilterState::Brewing);

    r.clock.set_offset(quiet_from + std::time::Duration::from_millis(2010));
    r.scale.get_filtered_weight();
    assert_eq!(r.scale.filter_state(), FilterState::Transitioning);

    r.clock.set_offset(quiet_from + std::time::Duration::from_millis(3990));
    r.scale.get_filtered_weight();
    assert_eq!(r.scale.filter_state(), FilterState::Transitioning);
    assert_eq!(r.scale.last_stable_weight(), 0.0);

    r.clock.set_offset(quiet_from + std::time::Duration::from_millis(4010));
    let settled = r.scale.get_filtered_weight();
    assert_eq!(r.scale.filter_state(), FilterState::Stable);
    assert_eq!(settled, 1.0);
    assert_eq!(r.scale.last_stable_weight(), 1.0);
}

#[test]
fn activity_while_transitioning_resumes_brewing() {
    let mut r = connected(1, 2000.0);
    r.read();
    r.load(0, 2000);
    r.read();
    r.read();
    r.clock.advance_ms(2100);
    r.scale.get_filtered_weight();
    assert_eq!(r.scale.filter_state(), FilterState::Transitioning);

    r.load(0, 3000);
    r.read();
    assert_eq!(r.scale.filter_state(), FilterState::Brewing);
}

#[test]
fn nan_reading_holds_weight_and_state() {
    let mut r = connected(1, 2000.0);
    r.load(0, 2000);
    r.read();
    r.load(0, 4000);
    r.read();
    let state = r.scale.filter_state();
    let held = r.scale.get_last_filtered_weight();

    r.cells[0].set_nan(true);
    r.load(0, 40_000);
    for _ in 0..5 {
        assert_eq!(r.read(), held);
    }
    assert_eq!(r.scale.filter_state(), state);

    r.clock.advance_ms(5000);
    r.read();
    assert_eq!(r.scale.health_status(), HealthStatus::SingleFailed);
}

#[test]
fn not_ready_sensor_holds_last_weight() {
    let mut r = connected(2, 1000.0);
    r.load(0, 1000);
    r.load(1, 1000);
    assert_eq!(r.read(), 2.0);

    r.cells[1].set_ready(false);
    r.load(1, 50_000);
    assert_eq!(r.read(), 2.0);
    assert_eq!(r.scale.filter_state(), FilterState::Stable);

    r.cells[1].set_ready(true);
    r.load(1, 1000);
    assert_eq!(r.read(), 2.0);
}

#[test]
fn disconnected_scale_reads_zero() {
    let mut r = rig(1, 2000.0);
    r.load(0, 2000);
    assert_eq!(r.read(), 0.0);
    assert_eq!(r.scale.get_raw_fused(), 0);
    assert_eq!(r.scale.raw_value(0), 0);
    assert_eq!(r.cells[0].raw_reads(), 0);
}

#[test]
fn raw_value_reports_one_channel() {
    let mut r = connected(2, 1000.0);
    r.bare_counts();
    r.load(0, 1200);
    r.load(1, -300);
    assert_eq!(r.scale.raw_value(0), 1200);
    assert_eq!(r.scale.raw_value(1), -300);
    assert_eq!(r.scale.raw_value(2), 0);
    assert_eq!(r.scale.get_raw_fused(), 900);
}
