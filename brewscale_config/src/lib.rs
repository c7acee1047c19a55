#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the brewscale acquisition engine.
//!
//! `Config` and its sections are deserialized from TOML and validated with
//! [`Config::validate`]. Only `[sensor]` is mandatory; every other section
//! falls back to the firmware defaults.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct SensorCfg {
    /// One data line (single load cell) or two (dual load cells sharing SCK).
    pub data_lines: Vec<u8>,
    /// Shared clock (SCK) line.
    pub clock_line: u8,
    /// Counts per gram used until a calibration has been persisted.
    pub calibration_factor: f32,
    /// How long initialization polls for a non-zero test reading (ms).
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    /// Poll interval while waiting for the test reading (ms).
    #[serde(default = "default_init_poll_ms")]
    pub init_poll_ms: u64,
    /// Pause between the initial per-channel zeroing operations (ms).
    #[serde(default = "default_init_channel_delay_ms")]
    pub init_channel_delay_ms: u64,
}

fn default_init_timeout_ms() -> u64 {
    3000
}
fn default_init_poll_ms() -> u64 {
    100
}
fn default_init_channel_delay_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterCfg {
    /// Minimum spacing between acquisitions (ms); faster calls return the
    /// previously filtered weight.
    pub sample_interval_ms: u64,
    /// A single-reading jump larger than this (grams) bypasses the filters.
    pub step_override_g: f32,
    /// TRANSITIONING settles to STABLE after `settle_multiplier` x stability timeout.
    pub settle_multiplier: u32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            sample_interval_ms: 20,
            step_override_g: 5.0,
            settle_multiplier: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TareCfg {
    /// Conversions averaged per channel when zeroing.
    pub repetitions: u8,
    /// Pause between channels when zeroing on a shared clock line (ms).
    pub channel_delay_ms: u64,
    /// Pause before the flow-rate consumer is resumed (ms).
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HealthCfg {
    /// A reading within this window counts as "recently active" (ms).
    pub recent_window_ms: u64,
    /// Spacing of the per-channel dual debug event (ms).
    pub debug_interval_ms: u64,
}

impl Default for HealthCfg {
    fn default() -> Self {
        Self {
            recent_window_ms: 5000,
            debug_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageCfg {
    /// Path of the persisted key/value file; `None` keeps everything in memory.
    pub path: Option<String>,
    /// Namespace all calibration and tuning keys live under.
    pub namespace: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: None,
            namespace: "scale".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub sensor: SensorCfg,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub tare: TareCfg,
    #[serde(default)]
    pub health: HealthCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    /// True when two load cells are configured.
    pub fn is_dual(&self) -> bool {
        self.sensor.data_lines.len() == 2
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        match self.sensor.data_lines.len() {
            1 | 2 => {}
            0 => eyre::bail!("sensor.data_lines must name at least one data line"),
            n => eyre::bail!("sensor.data_lines supports at most two load cells, got {n}"),
        }
        if let [a, b] = self.sensor.data_lines[..]
            && a == b
        {
            eyre::bail!("sensor.data_lines must be distinct");
        }
        if self.sensor.data_lines.contains(&self.sensor.clock_line) {
            eyre::bail!("sensor.clock_line must differ from every data line");
        }
        if !self.sensor.calibration_factor.is_finite() || self.sensor.calibration_factor == 0.0 {
            eyre::bail!("sensor.calibration_factor must be finite and non-zero");
        }
        if self.sensor.init_timeout_ms == 0 {
            eyre::bail!("sensor.init_timeout_ms must be >= 1");
        }
        if self.sensor.init_poll_ms == 0 {
            eyre::bail!("sensor.init_poll_ms must be >= 1");
        }

        // Filter
        if self.filter.sample_interval_ms == 0 {
            eyre::bail!("filter.sample_interval_ms must be >= 1");
        }
        if !(self.filter.step_override_g.is_finite() && self.filter.step_override_g > 0.0) {
            eyre::bail!("filter.step_override_g must be > 0");
        }
        if self.filter.settle_multiplier == 0 {
            eyre::bail!("filter.settle_multiplier must be >= 1");
        }

        // Tare
        if self.tare.repetitions == 0 {
            eyre::bail!("tare.repetitions must be >= 1");
        }

        // Health
        if self.health.recent_window_ms == 0 {
            eyre::bail!("health.recent_window_ms must be >= 1");
        }

        // Storage
        if self.storage.namespace.trim().is_empty() {
            eyre::bail!("storage.namespace must not be empty");
        }
        // NVS namespaces are limited to 15 bytes
        if self.storage.namespace.len() > 15 {
            eyre::bail!("storage.namespace must be at most 15 bytes");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {e}", path.display()))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
