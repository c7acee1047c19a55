//! Connection and recent-activity tracking.

use std::fmt;

use crate::util::within_window;

/// Sensor health as reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// Initialization never succeeded.
    Disconnected,
    SingleOk,
    SingleFailed,
    DualBothOk,
    DualBothFailed,
}

impl HealthStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::SingleOk => "SINGLE_OK",
            Self::SingleFailed => "SINGLE_FAILED",
            Self::DualBothOk => "DUAL_BOTH_OK",
            Self::DualBothFailed => "DUAL_BOTH_FAILED",
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::SingleOk | Self::DualBothOk)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `connected` latches on the first successful initialization and is never
/// cleared by later read failures; those only age out the last-success stamp.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    connected: bool,
    last_success_ms: Option<u64>,
    recent_window_ms: u64,
}

impl HealthMonitor {
    pub const fn new(recent_window_ms: u64) -> Self {
        Self {
            connected: false,
            last_success_ms: None,
            recent_window_ms,
        }
    }

    pub fn mark_connected(&mut self, now_ms: u64) {
        self.connected = true;
        self.last_success_ms = Some(now_ms);
    }

    pub fn record_success(&mut self, now_ms: u64) {
        self.last_success_ms = Some(now_ms);
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub const fn last_success_ms(&self) -> Option<u64> {
        self.last_success_ms
    }

    pub fn is_recently_active(&self, now_ms: u64) -> bool {
        self.last_success_ms
            .is_some_and(|t| within_window(now_ms, t, self.recent_window_ms))
    }

    pub fn status(&self, now_ms: u64, dual: bool) -> HealthStatus {
        if !self.connected {
            return HealthStatus::Disconnected;
        }
        match (dual, self.is_recently_active(now_ms)) {
            (false, true) => HealthStatus::SingleOk,
            (false, false) => HealthStatus::SingleFailed,
            (true, true) => HealthStatus::DualBothOk,
            (true, false) => HealthStatus::DualBothFailed,
        }
    }
}
