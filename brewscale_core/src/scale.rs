//! The `Scale` facade.
//!
//! Ties the channel bank, calibration, sample history, filter state machine,
//! tuning, health and tare together behind the operations a firmware-level
//! consumer (config server, display, flow-rate integrator) calls.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use brewscale_traits::{Clock, FlowRateHook, KvStore};

use crate::buffer::SampleHistory;
use crate::builder::ScaleBuilder;
use crate::calibration::CalibrationRecord;
use crate::config::{ScaleTiming, TareCfg};
use crate::error::{ScaleError, TuningError};
use crate::filter::{FilterSelector, FilterState, SelectorParams, Transition};
use crate::fusion::{fuse_grams, fuse_raw};
use crate::health::{HealthMonitor, HealthStatus};
use crate::reader::{ChannelBank, INIT_ZERO_REPETITIONS};
use crate::tuning::{LoadCellClass, TuningParameters};
use crate::util::{elapsed_exceeds, within_window};

/// Weight acquisition and adaptive filtering for one or two load cells.
///
/// Single-threaded; every operation is synchronous. Only `initialize()` and
/// `tare()` block, for bounded waits driven by the injected clock.
pub struct Scale {
    pub(crate) channels: ChannelBank,
    pub(crate) calibration: CalibrationRecord,
    /// Factor supplied at construction; fallback for absent persisted keys.
    pub(crate) configured_factor: f32,
    pub(crate) tuning: TuningParameters,
    pub(crate) detected_class: Option<LoadCellClass>,
    pub(crate) history: SampleHistory,
    pub(crate) selector: FilterSelector,
    pub(crate) health: HealthMonitor,
    pub(crate) store: Box<dyn KvStore>,
    pub(crate) namespace: String,
    pub(crate) flow_hook: Option<Weak<dyn FlowRateHook>>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) timing: ScaleTiming,
    pub(crate) tare_cfg: TareCfg,

    pub(crate) current_weight: f32,
    pub(crate) last_stable_weight: f32,
    pub(crate) last_sample_ms: Option<u64>,
    pub(crate) last_debug_ms: Option<u64>,
}

impl core::fmt::Debug for Scale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scale")
            .field("data_lines", &self.channels.data_lines())
            .field("clock_line", &self.channels.clock_line())
            .field("calibration", &self.calibration)
            .field("state", &self.selector.state())
            .field("weight_g", &self.current_weight)
            .field("connected", &self.health.is_connected())
            .finish_non_exhaustive()
    }
}

impl Scale {
    /// Start building a Scale.
    pub fn builder() -> ScaleBuilder {
        ScaleBuilder::default()
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Load persisted calibration and tuning, bind the load cells, wait for a
    /// non-zero test reading from every channel and zero them.
    ///
    /// On failure the scale stays disconnected; calling again retries.
    pub fn initialize(&mut self) -> Result<(), ScaleError> {
        self.load_settings();

        let mode = if self.is_dual_mode() { "dual" } else { "single" };
        tracing::info!(
            mode,
            data_lines = ?self.channels.data_lines(),
            clock_line = self.channels.clock_line(),
            "initializing load cells"
        );

        if let Err(e) = self.bring_up() {
            tracing::error!(error = %e, "load cell initialization failed");
            return Err(e);
        }

        let now = self.now_ms();
        self.health.mark_connected(now);
        self.history.invalidate();
        self.selector.reset();
        self.log_summary();
        Ok(())
    }

    fn bring_up(&mut self) -> Result<(), ScaleError> {
        self.channels.begin(&self.calibration)?;
        self.channels.await_test_readings(
            &*self.clock,
            Duration::from_millis(self.timing.init_timeout_ms),
            Duration::from_millis(self.timing.init_poll_ms),
        )?;
        tracing::info!("performing initial tare");
        self.channels.zero_all(
            INIT_ZERO_REPETITIONS,
            &*self.clock,
            Duration::from_millis(self.timing.init_channel_delay_ms),
        )
    }

    fn load_settings(&mut self) {
        match self
            .calibration
            .load(&mut *self.store, &self.namespace, self.configured_factor)
        {
            Ok(c) => {
                self.calibration = c;
                self.channels.apply_calibration(&c);
            }
            Err(e) => {
                tracing::warn!(error = %e, "calibration not loaded, using configured factor");
            }
        }
        self.load_tuning();
    }

    fn log_summary(&self) {
        let t = &self.tuning;
        tracing::info!(
            brewing_threshold_g = t.brewing_threshold,
            stability_timeout_ms = t.stability_timeout_ms,
            median_samples = t.median_samples,
            average_samples = t.average_samples,
            "adaptive filtering enabled"
        );
        match self.calibration {
            CalibrationRecord::Single(f) => tracing::info!(factor = f, "single load cell ready"),
            CalibrationRecord::Dual(a, b) => {
                tracing::info!(factor1 = a, factor2 = b, "dual load cells ready");
            }
        }
    }

    // ── Acquisition ──────────────────────────────────────────────────────────

    /// Acquire a reading and run it through the adaptive filter.
    ///
    /// Returns 0.0 while disconnected. Calls closer together than the sample
    /// interval, not-ready sensors, read errors and NaN readings all return the
    /// previous filtered weight with no state change.
    pub fn get_filtered_weight(&mut self) -> f32 {
        if !self.health.is_connected() {
            return 0.0;
        }

        let now = self.now_ms();
        if let Some(last) = self.last_sample_ms
            && within_window(now, last, self.timing.sample_interval_ms)
        {
            return self.current_weight;
        }
        self.last_sample_ms = Some(now);

        let Some(raw) = self.acquire(now) else {
            return self.current_weight;
        };
        if raw.is_nan() {
            return self.current_weight;
        }
        self.health.record_success(now);

        if !self.history.is_initialized() {
            self.history.initialize(raw);
            self.current_weight = raw;
            self.last_stable_weight = raw;
            self.selector.reset();
            return raw;
        }

        self.history.push(raw);
        let delta = (raw - self.current_weight).abs();
        let params = self.selector_params();
        let transition = self.selector.step(delta, now, &params);
        if transition == Transition::Settled {
            self.last_stable_weight = self.current_weight;
        }

        let mut filtered = if self.selector.state().uses_median() {
            self.history.median(self.tuning.median_samples)
        } else {
            self.history.average(self.tuning.average_samples)
        };

        if delta > self.timing.step_override_g {
            filtered = raw;
            self.history.initialize(raw);
            self.selector.force_brewing(now);
            tracing::trace!(raw, delta, "step change, filter bypassed");
        }

        self.current_weight = filtered;
        filtered
    }

    /// Fused grams from all channels, or `None` to hold the last weight.
    fn acquire(&mut self, now: u64) -> Option<f32> {
        if !self.channels.all_ready() {
            tracing::trace!("load cell not ready, holding last weight");
            return None;
        }
        let grams = match self.channels.read_grams() {
            Ok(g) => g,
            Err(e) => {
                tracing::debug!(error = %e, "read failed, holding last weight");
                return None;
            }
        };
        let fused = fuse_grams(&grams);

        if let [cell1, cell2] = grams[..]
            && self
                .last_debug_ms
                .is_none_or(|t| elapsed_exceeds(now, t, self.timing.debug_interval_ms))
        {
            tracing::debug!(cell1, cell2, total = fused, "dual load cell reading");
            self.last_debug_ms = Some(now);
        }
        Some(fused)
    }

    fn selector_params(&self) -> SelectorParams {
        SelectorParams {
            brewing_threshold: self.tuning.brewing_threshold,
            stability_timeout_ms: u64::from(self.tuning.stability_timeout_ms),
            settle_multiplier: self.timing.settle_multiplier,
        }
    }

    /// Last filtered weight; never acquires.
    pub const fn get_last_filtered_weight(&self) -> f32 {
        self.current_weight
    }

    /// Weight captured when the filter last confirmed STABLE (or the first
    /// reading after initialization / tare).
    pub const fn last_stable_weight(&self) -> f32 {
        self.last_stable_weight
    }

    /// Sum of the raw counts of all channels.
    pub fn try_raw_fused(&mut self) -> Result<i64, ScaleError> {
        if !self.health.is_connected() {
            return Err(ScaleError::NotConnected);
        }
        self.channels.read_raw().map(|raw| fuse_raw(&raw))
    }

    /// Sum of the raw counts of all channels; 0 when disconnected or on error.
    pub fn get_raw_fused(&mut self) -> i64 {
        self.try_raw_fused().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "raw read failed");
            0
        })
    }

    /// Raw count of one channel (0-based); 0 when disconnected, out of range
    /// or on error.
    pub fn raw_value(&mut self, channel: usize) -> i32 {
        if !self.health.is_connected() {
            return 0;
        }
        let Some(ch) = self.channels.channel_mut(channel) else {
            return 0;
        };
        ch.read_raw().unwrap_or_else(|e| {
            tracing::warn!(channel, error = %e, "raw read failed");
            0
        })
    }

    // ── Tare ─────────────────────────────────────────────────────────────────

    /// Tare with the configured repetitions (20 by default).
    pub fn tare(&mut self) -> Result<(), ScaleError> {
        self.tare_times(self.tare_cfg.repetitions)
    }

    /// Zero every channel, reset the filter to STABLE at 0 g and force the
    /// sample history to reseed on the next reading.
    ///
    /// An attached flow-rate consumer is paused for the duration and resumed
    /// after the settle delay.
    pub fn tare_times(&mut self, repetitions: u8) -> Result<(), ScaleError> {
        if !self.health.is_connected() {
            tracing::warn!("cannot tare: load cell not connected");
            return Err(ScaleError::NotConnected);
        }

        let hook = self.flow_hook.as_ref().and_then(Weak::upgrade);
        if let Some(h) = &hook {
            h.pause_calculation();
        }

        tracing::info!(repetitions, "taring");
        let zeroed = self.channels.zero_all(
            repetitions,
            &*self.clock,
            Duration::from_millis(self.tare_cfg.channel_delay_ms),
        );
        if let Err(e) = zeroed {
            tracing::warn!(error = %e, "tare failed");
            if let Some(h) = &hook {
                h.resume_calculation();
            }
            return Err(e);
        }

        self.selector.reset();
        self.current_weight = 0.0;
        self.last_stable_weight = 0.0;
        self.history.invalidate();
        tracing::info!("tare complete, filter reset to STABLE");

        if let Some(h) = hook {
            self.clock
                .sleep(Duration::from_millis(self.tare_cfg.settle_delay_ms));
            h.resume_calculation();
        }
        Ok(())
    }

    /// Attach the flow-rate consumer paused during tare. Only a weak
    /// reference is kept; a dropped consumer is simply skipped.
    pub fn set_flow_rate_hook<H: FlowRateHook + 'static>(&mut self, hook: &Arc<H>) {
        let weak = Arc::downgrade(hook);
        self.flow_hook = Some(weak);
    }

    pub fn clear_flow_rate_hook(&mut self) {
        self.flow_hook = None;
    }

    // ── Calibration ──────────────────────────────────────────────────────────

    pub const fn calibration(&self) -> CalibrationRecord {
        self.calibration
    }

    /// Combined factor: the single factor, or the mean of both channels.
    pub fn calibration_factor(&self) -> f32 {
        self.calibration.combined()
    }

    /// Factor of one channel (0-based).
    pub const fn channel_factor(&self, channel: usize) -> Option<f32> {
        self.calibration.factor(channel)
    }

    /// Apply `factor` to every channel and persist it. A no-op that writes
    /// nothing when every channel already uses `factor`.
    pub fn set_calibration_factor(&mut self, factor: f32) -> Result<(), ScaleError> {
        if !self.calibration.set_combined(factor)? {
            return Ok(());
        }
        self.channels.apply_calibration(&self.calibration);
        tracing::info!(factor, "calibration factor set");
        self.persist_calibration();
        Ok(())
    }

    /// Set per-channel factors and persist them. In single mode only `first`
    /// is used.
    pub fn set_calibration_factors(&mut self, first: f32, second: f32) -> Result<(), ScaleError> {
        if !self.calibration.set_factors(first, second)? {
            return Ok(());
        }
        self.channels.apply_calibration(&self.calibration);
        tracing::info!(
            factor1 = first,
            factor2 = second,
            combined = self.calibration.combined(),
            "calibration factors set"
        );
        self.persist_calibration();
        Ok(())
    }

    pub fn save_calibration(&mut self) -> Result<(), ScaleError> {
        self.calibration.save(&mut *self.store, &self.namespace)
    }

    /// Reload the factor(s) from the store and hand them to the channels.
    pub fn load_calibration(&mut self) -> Result<(), ScaleError> {
        let c = self
            .calibration
            .load(&mut *self.store, &self.namespace, self.configured_factor)?;
        self.calibration = c;
        self.channels.apply_calibration(&c);
        Ok(())
    }

    fn persist_calibration(&mut self) {
        if let Err(e) = self.save_calibration() {
            tracing::warn!(error = %e, "calibration not persisted");
        }
    }

    // ── Tuning ───────────────────────────────────────────────────────────────

    pub const fn tuning(&self) -> TuningParameters {
        self.tuning
    }

    pub const fn brewing_threshold(&self) -> f32 {
        self.tuning.brewing_threshold
    }

    pub const fn stability_timeout_ms(&self) -> u32 {
        self.tuning.stability_timeout_ms
    }

    pub const fn median_samples(&self) -> usize {
        self.tuning.median_samples
    }

    pub const fn average_samples(&self) -> usize {
        self.tuning.average_samples
    }

    /// Class detected by the first-boot threshold heuristic, if it ran.
    pub const fn detected_load_cell_class(&self) -> Option<LoadCellClass> {
        self.detected_class
    }

    /// Accepts `0.05..=1.0` g. Returns false, changing and writing nothing,
    /// for anything else.
    pub fn set_brewing_threshold(&mut self, grams: f32) -> bool {
        self.apply_tuning(|t| t.set_brewing_threshold(grams))
    }

    /// Accepts `500..=10000` ms.
    pub fn set_stability_timeout_ms(&mut self, ms: u32) -> bool {
        self.apply_tuning(|t| t.set_stability_timeout_ms(ms))
    }

    /// Accepts `1..=MAX_SAMPLES`.
    pub fn set_median_samples(&mut self, samples: usize) -> bool {
        self.apply_tuning(|t| t.set_median_samples(samples))
    }

    /// Accepts `1..=MAX_SAMPLES`.
    pub fn set_average_samples(&mut self, samples: usize) -> bool {
        self.apply_tuning(|t| t.set_average_samples(samples))
    }

    fn apply_tuning(
        &mut self,
        apply: impl FnOnce(&mut TuningParameters) -> Result<(), TuningError>,
    ) -> bool {
        match apply(&mut self.tuning) {
            Ok(()) => {
                tracing::info!(tuning = ?self.tuning, "filter tuning changed");
                self.persist_tuning();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "filter tuning change rejected");
                false
            }
        }
    }

    /// Write all four tuning parameters.
    pub fn save_tuning(&mut self) -> Result<(), ScaleError> {
        self.tuning.save(&mut *self.store, &self.namespace)
    }

    /// Reload tuning from the store. When no threshold is stored yet it is
    /// derived from the calibration factor and persisted immediately.
    pub fn load_tuning(&mut self) {
        let factor = self.calibration.combined();
        match TuningParameters::load(&mut *self.store, &self.namespace, factor) {
            Ok(loaded) => {
                self.tuning = loaded.params;
                if let Some(class) = loaded.detected_class {
                    self.detected_class = Some(class);
                    tracing::info!(
                        class = %class,
                        factor,
                        brewing_threshold_g = self.tuning.brewing_threshold,
                        "load cell class detected"
                    );
                    self.persist_tuning();
                }
            }
            Err(e) => tracing::warn!(error = %e, "tuning not loaded, keeping current values"),
        }
    }

    fn persist_tuning(&mut self) {
        if let Err(e) = self.save_tuning() {
            tracing::warn!(error = %e, "filter tuning not persisted");
        }
    }

    // ── Status ───────────────────────────────────────────────────────────────

    pub const fn filter_state(&self) -> FilterState {
        self.selector.state()
    }

    /// "STABLE", "BREWING" or "TRANSITIONING".
    pub const fn filter_state_name(&self) -> &'static str {
        self.selector.state().as_str()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.health.status(self.now_ms(), self.is_dual_mode())
    }

    pub const fn is_connected(&self) -> bool {
        self.health.is_connected()
    }

    pub fn is_dual_mode(&self) -> bool {
        self.channels.is_dual()
    }

    pub fn data_lines(&self) -> Vec<u8> {
        self.channels.data_lines()
    }

    pub const fn clock_line(&self) -> u8 {
        self.channels.clock_line()
    }

    pub const fn timing(&self) -> &ScaleTiming {
        &self.timing
    }
}
