mod common;

use std::time::Duration;

use brewscale_core::{HealthStatus, ScaleError};
use common::{connected, rig};
use rstest::rstest;

#[rstest]
#[case::single(1, HealthStatus::SingleOk, HealthStatus::SingleFailed)]
#[case::dual(2, HealthStatus::DualBothOk, HealthStatus::DualBothFailed)]
fn status_follows_recent_readings(
    #[case] channels: usize,
    #[case] ok: HealthStatus,
    #[case] failed: HealthStatus,
) {
    let mut r = connected(channels, 2000.0);
    assert_eq!(r.scale.health_status(), ok);

    r.clock.advance_ms(4999);
    assert_eq!(r.scale.health_status(), ok);
    r.clock.advance_ms(1);
    assert_eq!(r.scale.health_status(), failed);

    r.read();
    assert_eq!(r.scale.health_status(), ok);
}

#[test]
fn silent_sensor_ages_out_but_stays_connected() {
    let mut r = connected(1, 2000.0);
    r.load(0, 2000);
    r.read();
    r.cells[0].set_ready(false);
    for _ in 0..250 {
        assert_eq!(r.read(), 1.0);
    }
    assert_eq!(r.scale.health_status(), HealthStatus::SingleFailed);
    assert_eq!(r.scale.health_status().as_str(), "SINGLE_FAILED");
    assert!(r.scale.is_connected());
}

#[test]
fn nan_readings_do_not_count_as_healthy() {
    let mut r = connected(2, 1000.0);
    r.cells[1].set_nan(true);
    r.clock.advance_ms(5000);
    r.read();
    assert_eq!(r.scale.health_status(), HealthStatus::DualBothFailed);
}

#[test]
fn unresponsive_channel_fails_initialization() {
    let mut r = rig(2, 1000.0);
    r.cells[1].set_ready(false);

    let err = r.scale.initialize().unwrap_err();
    assert_eq!(
        err,
        ScaleError::InitializationFailed {
            failed_lines: vec![6]
        }
    );
    assert_eq!(r.clock.elapsed(), Duration::from_millis(3000));
    assert!(!r.scale.is_connected());
    assert_eq!(r.scale.health_status(), HealthStatus::Disconnected);
    assert_eq!(r.scale.health_status().as_str(), "DISCONNECTED");

    // Nothing is read or zeroed while disconnected.
    assert_eq!(r.scale.get_filtered_weight(), 0.0);
    assert_eq!(r.scale.get_raw_fused(), 0);
    assert_eq!(r.scale.raw_value(0), 0);
    assert_eq!(r.scale.tare(), Err(ScaleError::NotConnected));
    assert_eq!(r.cells[0].zero_calls(), 0);

    r.cells[1].set_ready(true);
    r.scale.initialize().unwrap();
    assert!(r.scale.is_connected());
    assert_eq!(r.scale.health_status(), HealthStatus::DualBothOk);
}

#[test]
fn zero_reading_counts_as_no_response() {
    let mut r = rig(1, 2000.0);
    r.cells[0].set_baseline(0);
    let err = r.scale.initialize().unwrap_err();
    assert!(matches!(err, ScaleError::InitializationFailed { .. }));
    assert!(r.cells[0].raw_reads() > 1);
}

#[test]
fn slow_channel_is_polled_until_ready() {
    let mut r = rig(2, 1000.0);
    r.cells[0].not_ready_for(3);
    r.scale.initialize().unwrap();
    // Three 100 ms polls, then the 100 ms gap between zeroing the channels.
    assert_eq!(r.clock.elapsed(), Duration::from_millis(400));
    for cell in &r.cells {
        assert_eq!(cell.zero_calls(), 1);
        assert_eq!(cell.last_zero_repetitions(), 10);
    }
}

#[test]
fn bind_failure_is_a_hardware_fault() {
    let mut r = rig(1, 2000.0);
    r.cells[0].fail_begin(true);
    let err = r.scale.initialize().unwrap_err();
    assert!(matches!(err, ScaleError::HardwareFault(_)), "{err:?}");
    assert!(!r.scale.is_connected());
}

#[test]
fn init_binds_configured_lines() {
    let r = connected(2, 1000.0);
    assert_eq!(r.cells[0].lines(), Some((4, 5)));
    assert_eq!(r.cells[1].lines(), Some((6, 5)));
    assert!(r.scale.is_dual_mode());
    assert_eq!(r.scale.data_lines(), vec![4, 6]);
    assert_eq!(r.scale.clock_line(), 5);
}
