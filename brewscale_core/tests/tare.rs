mod common;

use std::time::Duration;

use brewscale_core::mocks::{FlowEvent, RecordingFlowHook};
use brewscale_core::{FilterState, ScaleError};
use common::{connected, rig};
use rstest::rstest;

#[test]
fn tare_resets_filter_and_reseeds_history() {
    let mut r = connected(1, 2000.0);
    r.load(0, 6000);
    r.read();
    r.load(0, 7000);
    r.read();
    assert_eq!(r.scale.filter_state(), FilterState::Brewing);

    r.scale.tare().unwrap();
    assert_eq!(r.scale.filter_state(), FilterState::Stable);
    assert_eq!(r.scale.get_last_filtered_weight(), 0.0);
    assert_eq!(r.scale.last_stable_weight(), 0.0);

    // The next reading seeds the history uniformly instead of counting as a
    // step from 0 g.
    r.load(0, 11_000);
    assert_eq!(r.read(), 2.0);
    assert_eq!(r.scale.filter_state(), FilterState::Stable);
    assert_eq!(r.scale.last_stable_weight(), 2.0);
    assert_eq!(r.read(), 2.0);
}

#[rstest]
#[case::default_repetitions(None, 20)]
#[case::explicit(Some(5), 5)]
fn tare_passes_repetitions_to_every_channel(#[case] times: Option<u8>, #[case] expected: u8) {
    let mut r = connected(2, 1000.0);
    match times {
        Some(n) => r.scale.tare_times(n).unwrap(),
        None => r.scale.tare().unwrap(),
    }
    for cell in &r.cells {
        assert_eq!(cell.zero_calls(), 2, "initial zero plus tare");
        assert_eq!(cell.last_zero_repetitions(), expected);
    }
}

#[test]
fn tare_zeroes_current_load() {
    let mut r = connected(1, 2000.0);
    r.load(0, 5000);
    r.scale.tare().unwrap();
    assert_eq!(r.read(), 0.0);
    assert_eq!(r.cells[0].offset(), r.cells[0].raw());
}

#[test]
fn tare_when_disconnected_is_rejected() {
    let mut r = rig(1, 2000.0);
    let hook = RecordingFlowHook::new();
    r.scale.set_flow_rate_hook(&hook);
    assert_eq!(r.scale.tare(), Err(ScaleError::NotConnected));
    assert!(hook.events().is_empty());
    assert_eq!(r.cells[0].zero_calls(), 0);
}

#[test]
fn hook_is_paused_for_zeroing_and_settle_delay() {
    let mut r = connected(2, 1000.0);
    let hook = RecordingFlowHook::with_clock(r.clock.clone());
    r.scale.set_flow_rate_hook(&hook);

    let start = r.clock.elapsed();
    r.scale.tare().unwrap();

    let events = hook.timed_events();
    assert_eq!(
        events,
        vec![
            (FlowEvent::Pause, Some(start)),
            (FlowEvent::Resume, Some(start + Duration::from_millis(150))),
        ]
    );
}

#[test]
fn single_channel_tare_has_no_channel_gap() {
    let mut r = connected(1, 2000.0);
    let hook = RecordingFlowHook::with_clock(r.clock.clone());
    r.scale.set_flow_rate_hook(&hook);
    let start = r.clock.elapsed();
    r.scale.tare().unwrap();
    assert_eq!(
        hook.timed_events()[1],
        (FlowEvent::Resume, Some(start + Duration::from_millis(100)))
    );
}

#[test]
fn settle_delay_only_applies_with_hook() {
    let mut r = connected(2, 1000.0);
    let start = r.clock.elapsed();
    r.scale.tare().unwrap();
    assert_eq!(r.clock.elapsed() - start, Duration::from_millis(50));
}

#[test]
fn dropped_hook_is_skipped() {
    let mut r = connected(1, 2000.0);
    let hook = RecordingFlowHook::new();
    r.scale.set_flow_rate_hook(&hook);
    drop(hook);
    let start = r.clock.elapsed();
    r.scale.tare().unwrap();
    assert_eq!(r.clock.elapsed(), start);
}

#[test]
fn cleared_hook_is_not_called() {
    let mut r = connected(1, 2000.0);
    let hook = RecordingFlowHook::new();
    r.scale.set_flow_rate_hook(&hook);
    r.scale.clear_flow_rate_hook();
    r.scale.tare().unwrap();
    assert!(hook.events().is_empty());
}
