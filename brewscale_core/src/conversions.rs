//! `From` implementations bridging `brewscale_config` types to `brewscale_core` types.

use crate::calibration::CalibrationRecord;
use crate::config::{ScaleTiming, TareCfg};

// ── ScaleTiming ──────────────────────────────────────────────────────────────

impl From<&brewscale_config::Config> for ScaleTiming {
    fn from(c: &brewscale_config::Config) -> Self {
        Self {
            init_timeout_ms: c.sensor.init_timeout_ms,
            init_poll_ms: c.sensor.init_poll_ms,
            init_channel_delay_ms: c.sensor.init_channel_delay_ms,
            sample_interval_ms: c.filter.sample_interval_ms,
            step_override_g: c.filter.step_override_g,
            settle_multiplier: c.filter.settle_multiplier,
            recent_window_ms: c.health.recent_window_ms,
            debug_interval_ms: c.health.debug_interval_ms,
        }
    }
}

// ── TareCfg ──────────────────────────────────────────────────────────────────

impl From<&brewscale_config::TareCfg> for TareCfg {
    fn from(c: &brewscale_config::TareCfg) -> Self {
        Self {
            repetitions: c.repetitions,
            channel_delay_ms: c.channel_delay_ms,
            settle_delay_ms: c.settle_delay_ms,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

/// Configured factor on every channel; used until a calibration is loaded.
impl From<&brewscale_config::SensorCfg> for CalibrationRecord {
    fn from(c: &brewscale_config::SensorCfg) -> Self {
        Self::uniform(c.calibration_factor, c.data_lines.len() == 2)
    }
}
