//! Builder for `Scale`.
//!
//! Collects the load cells, store, clock and configuration, validates them on
//! `build()` and returns typed `BuildError`s wrapped in `eyre::Report`.

use std::sync::Arc;

use brewscale_traits::{Clock, KvStore, LoadCell, MonotonicClock};

use crate::buffer::SampleHistory;
use crate::calibration::{CalibrationRecord, check_factor};
use crate::config::{ScaleTiming, TareCfg};
use crate::error::{BuildError, Result};
use crate::filter::FilterSelector;
use crate::health::HealthMonitor;
use crate::reader::{Channel, ChannelBank};
use crate::scale::Scale;
use crate::tuning::TuningParameters;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "scale";

/// Builder for `Scale`. All fields are validated on `build()`.
#[derive(Default)]
pub struct ScaleBuilder {
    channels: Vec<Channel>,
    clock_line: Option<u8>,
    calibration_factor: Option<f32>,
    store: Option<Box<dyn KvStore>>,
    namespace: Option<String>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    timing: Option<ScaleTiming>,
    tare: Option<TareCfg>,
}

impl ScaleBuilder {
    /// Add a load cell on `data_line`. One channel means single mode, two
    /// means dual mode on a shared clock line.
    pub fn with_channel(mut self, data_line: u8, cell: impl LoadCell + 'static) -> Self {
        self.channels.push(Channel::new(data_line, Box::new(cell)));
        self
    }
    pub fn with_clock_line(mut self, clock_line: u8) -> Self {
        self.clock_line = Some(clock_line);
        self
    }
    /// Counts per gram used until a calibration is loaded from the store.
    pub fn with_calibration_factor(mut self, factor: f32) -> Self {
        self.calibration_factor = Some(factor);
        self
    }
    pub fn with_store(mut self, store: impl KvStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    pub fn with_timing(mut self, timing: ScaleTiming) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_tare(mut self, tare: TareCfg) -> Self {
        self.tare = Some(tare);
        self
    }

    /// Apply everything in a validated config except the load cells and store.
    pub fn with_config(self, cfg: &brewscale_config::Config) -> Self {
        self.with_clock_line(cfg.sensor.clock_line)
            .with_calibration_factor(cfg.sensor.calibration_factor)
            .with_namespace(cfg.storage.namespace.clone())
            .with_timing(ScaleTiming::from(cfg))
            .with_tare(TareCfg::from(&cfg.tare))
    }

    pub fn build(self) -> Result<Scale> {
        // ── Validation ───────────────────────────────────────────────────────
        match self.channels.len() {
            0 => return Err(eyre::Report::new(BuildError::MissingChannel)),
            1 | 2 => {}
            n => return Err(eyre::Report::new(BuildError::TooManyChannels(n))),
        }
        let clock_line = self.clock_line.ok_or_else(|| {
            eyre::Report::new(BuildError::InvalidConfig("clock line must be set"))
        })?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let factor = self.calibration_factor.ok_or_else(|| {
            eyre::Report::new(BuildError::InvalidConfig("calibration factor must be set"))
        })?;
        if check_factor(factor).is_err() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "calibration factor must be finite and non-zero",
            )));
        }
        if let [a, b] = self.channels.as_slice()
            && a.data_line() == b.data_line()
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "data lines must be distinct",
            )));
        }
        if self.channels.iter().any(|c| c.data_line() == clock_line) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "clock line must differ from every data line",
            )));
        }
        let namespace = self
            .namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if namespace.trim().is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "namespace must not be empty",
            )));
        }

        let timing = self.timing.unwrap_or_default();
        if timing.init_timeout_ms == 0 || timing.init_poll_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "init timeout and poll interval must be >= 1 ms",
            )));
        }
        if timing.sample_interval_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sample interval must be >= 1 ms",
            )));
        }
        if !(timing.step_override_g.is_finite() && timing.step_override_g > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "step override must be > 0 g",
            )));
        }
        if timing.settle_multiplier == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "settle multiplier must be >= 1",
            )));
        }
        if timing.recent_window_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "health window must be >= 1 ms",
            )));
        }
        let tare = self.tare.unwrap_or_default();
        if tare.repetitions == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tare repetitions must be >= 1",
            )));
        }

        // ── Assemble ─────────────────────────────────────────────────────────
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();
        let dual = self.channels.len() == 2;

        Ok(Scale {
            channels: ChannelBank::new(clock_line, self.channels),
            calibration: CalibrationRecord::uniform(factor, dual),
            configured_factor: factor,
            tuning: TuningParameters::default(),
            detected_class: None,
            history: SampleHistory::new(),
            selector: FilterSelector::new(),
            health: HealthMonitor::new(timing.recent_window_ms),
            store,
            namespace,
            flow_hook: None,
            clock,
            epoch,
            timing,
            tare_cfg: tare,
            current_weight: 0.0,
            last_stable_weight: 0.0,
            last_sample_ms: None,
            last_debug_ms: None,
        })
    }
}
