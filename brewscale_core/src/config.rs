//! Runtime configuration for the scale.
//!
//! These are separate from the TOML-deserialized config in `brewscale_config`;
//! see `conversions` for the mapping.

/// Timing and filter constants that are not user tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTiming {
    /// Bound on waiting for non-zero test readings during initialization.
    pub init_timeout_ms: u64,
    /// Poll interval while waiting for test readings.
    pub init_poll_ms: u64,
    /// Pause between per-channel zeroing during initialization.
    pub init_channel_delay_ms: u64,
    /// Readings are acquired at most this often; calls in between return the
    /// previous filtered weight.
    pub sample_interval_ms: u64,
    /// A jump larger than this (grams) bypasses the filters.
    pub step_override_g: f32,
    /// TRANSITIONING -> STABLE waits `settle_multiplier x stability timeout`.
    pub settle_multiplier: u32,
    /// A fused reading within this window counts as healthy.
    pub recent_window_ms: u64,
    /// Spacing of the per-channel debug event in dual mode.
    pub debug_interval_ms: u64,
}

impl Default for ScaleTiming {
    fn default() -> Self {
        Self {
            init_timeout_ms: 3000,
            init_poll_ms: 100,
            init_channel_delay_ms: 100,
            sample_interval_ms: 20,
            step_override_g: 5.0,
            settle_multiplier: 2,
            recent_window_ms: 5000,
            debug_interval_ms: 5000,
        }
    }
}

/// Tare behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TareCfg {
    /// Repetitions used by `Scale::tare()`.
    pub repetitions: u8,
    /// Pause between channels on a shared clock line.
    pub channel_delay_ms: u64,
    /// Pause before the flow-rate consumer is resumed.
    pub settle_delay_ms: u64,
}

impl Default for TareCfg {
    fn default() -> Self {
        Self {
            repetitions: 20,
            channel_delay_ms: 50,
            settle_delay_ms: 100,
        }
    }
}
