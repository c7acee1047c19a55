//! Test and helper doubles for brewscale_core

use std::sync::{Arc, Mutex};
use std::time::Duration;

use brewscale_traits::{FlowRateHook, ManualClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    Pause,
    Resume,
}

/// A flow-rate consumer that records every pause/resume call, optionally
/// stamped with the time of a shared [`ManualClock`].
#[derive(Debug, Default)]
pub struct RecordingFlowHook {
    events: Mutex<Vec<(FlowEvent, Option<Duration>)>>,
    clock: Option<ManualClock>,
}

impl RecordingFlowHook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_clock(clock: ManualClock) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::default(),
            clock: Some(clock),
        })
    }

    pub fn events(&self) -> Vec<FlowEvent> {
        self.timed_events().into_iter().map(|(e, _)| e).collect()
    }

    /// Events with the clock offset at which they arrived.
    pub fn timed_events(&self) -> Vec<(FlowEvent, Option<Duration>)> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn record(&self, event: FlowEvent) {
        let at = self.clock.as_ref().map(ManualClock::elapsed);
        if let Ok(mut v) = self.events.lock() {
            v.push((event, at));
        }
    }
}

impl FlowRateHook for RecordingFlowHook {
    fn pause_calculation(&self) {
        self.record(FlowEvent::Pause);
    }

    fn resume_calculation(&self) {
        self.record(FlowEvent::Resume);
    }
}
