//! Filter tuning parameters, their bounds and persistence.

use std::fmt;
use std::ops::RangeInclusive;

use brewscale_traits::KvStore;

use crate::buffer::MAX_SAMPLES;
use crate::error::{ScaleError, TuningError};
use crate::store::{StoreSession, storage_error};

pub const KEY_BREWING_THRESHOLD: &str = "brew_thresh";
pub const KEY_STABILITY_TIMEOUT: &str = "stab_timeout";
pub const KEY_MEDIAN_SAMPLES: &str = "median_samples";
pub const KEY_AVERAGE_SAMPLES: &str = "avg_samples";

pub const BREWING_THRESHOLD_RANGE: RangeInclusive<f32> = 0.05..=1.0;
pub const STABILITY_TIMEOUT_RANGE_MS: RangeInclusive<u32> = 500..=10_000;
pub const SAMPLE_COUNT_RANGE: RangeInclusive<usize> = 1..=MAX_SAMPLES;

/// Sensitivity class inferred from the calibration factor magnitude on first
/// boot; picks the default brewing threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadCellClass {
    /// |factor| < 1000, e.g. 3 kg cells.
    LowCapacity,
    /// |factor| < 2500.
    Medium,
    /// Everything above, e.g. 500 g / 2 mV/V cells.
    HighSensitivity,
}

impl LoadCellClass {
    pub fn from_factor(factor: f32) -> Self {
        let magnitude = factor.abs();
        if magnitude < 1000.0 {
            Self::LowCapacity
        } else if magnitude < 2500.0 {
            Self::Medium
        } else {
            Self::HighSensitivity
        }
    }

    pub const fn default_brewing_threshold(self) -> f32 {
        match self {
            Self::LowCapacity => 0.25,
            Self::Medium => 0.15,
            Self::HighSensitivity => 0.1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowCapacity => "low-capacity",
            Self::Medium => "medium",
            Self::HighSensitivity => "high-sensitivity",
        }
    }
}

impl fmt::Display for LoadCellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningParameters {
    /// Delta (grams) above which a reading counts as brewing activity.
    pub brewing_threshold: f32,
    /// Quiet time before BREWING relaxes to TRANSITIONING (ms).
    pub stability_timeout_ms: u32,
    /// Median window while BREWING.
    pub median_samples: usize,
    /// Average window while STABLE or TRANSITIONING.
    pub average_samples: usize,
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            brewing_threshold: 0.15,
            stability_timeout_ms: 2000,
            median_samples: 3,
            average_samples: 2,
        }
    }
}

/// Result of [`TuningParameters::load`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedTuning {
    pub params: TuningParameters,
    /// Set when no threshold was stored and it was derived from the factor.
    pub detected_class: Option<LoadCellClass>,
}

fn out_of_range<T: Into<f64> + Copy>(
    param: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> TuningError {
    TuningError::OutOfRange {
        param,
        value: value.into(),
        min: (*range.start()).into(),
        max: (*range.end()).into(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn samples_out_of_range(param: &'static str, value: usize) -> TuningError {
    TuningError::OutOfRange {
        param,
        value: value as f64,
        min: *SAMPLE_COUNT_RANGE.start() as f64,
        max: *SAMPLE_COUNT_RANGE.end() as f64,
    }
}

impl TuningParameters {
    pub fn set_brewing_threshold(&mut self, grams: f32) -> Result<(), TuningError> {
        if !BREWING_THRESHOLD_RANGE.contains(&grams) {
            return Err(out_of_range(
                "brewing_threshold",
                grams,
                &BREWING_THRESHOLD_RANGE,
            ));
        }
        self.brewing_threshold = grams;
        Ok(())
    }

    pub fn set_stability_timeout_ms(&mut self, ms: u32) -> Result<(), TuningError> {
        if !STABILITY_TIMEOUT_RANGE_MS.contains(&ms) {
            return Err(out_of_range(
                "stability_timeout_ms",
                ms,
                &STABILITY_TIMEOUT_RANGE_MS,
            ));
        }
        self.stability_timeout_ms = ms;
        Ok(())
    }

    pub fn set_median_samples(&mut self, samples: usize) -> Result<(), TuningError> {
        if !SAMPLE_COUNT_RANGE.contains(&samples) {
            return Err(samples_out_of_range("median_samples", samples));
        }
        self.median_samples = samples;
        Ok(())
    }

    pub fn set_average_samples(&mut self, samples: usize) -> Result<(), TuningError> {
        if !SAMPLE_COUNT_RANGE.contains(&samples) {
            return Err(samples_out_of_range("average_samples", samples));
        }
        self.average_samples = samples;
        Ok(())
    }

    /// Check all four values against their bounds.
    pub fn validate(&self) -> Result<(), TuningError> {
        let mut candidate = Self::default();
        candidate.set_brewing_threshold(self.brewing_threshold)?;
        candidate.set_stability_timeout_ms(self.stability_timeout_ms)?;
        candidate.set_median_samples(self.median_samples)?;
        candidate.set_average_samples(self.average_samples)
    }

    /// Write all four parameters in one session.
    pub fn save(&self, store: &mut dyn KvStore, namespace: &str) -> Result<(), ScaleError> {
        let median = i32::try_from(self.median_samples)
            .map_err(|_| ScaleError::Storage("median_samples does not fit i32".into()))?;
        let average = i32::try_from(self.average_samples)
            .map_err(|_| ScaleError::Storage("average_samples does not fit i32".into()))?;
        let mut s = StoreSession::open(store, namespace, false)?;
        s.put_f32(KEY_BREWING_THRESHOLD, self.brewing_threshold)
            .map_err(storage_error)?;
        s.put_u32(KEY_STABILITY_TIMEOUT, self.stability_timeout_ms)
            .map_err(storage_error)?;
        s.put_i32(KEY_MEDIAN_SAMPLES, median).map_err(storage_error)?;
        s.put_i32(KEY_AVERAGE_SAMPLES, average)
            .map_err(storage_error)?;
        Ok(())
    }

    /// Read the stored parameters.
    ///
    /// Missing keys take the defaults. When the threshold key is absent the
    /// threshold is derived from `factor` instead and `detected_class` is set;
    /// the caller persists the result so later boots skip the heuristic.
    /// Stored values outside their bounds are replaced by defaults.
    pub fn load(
        store: &mut dyn KvStore,
        namespace: &str,
        factor: f32,
    ) -> Result<LoadedTuning, ScaleError> {
        let defaults = Self::default();
        let s = StoreSession::open(store, namespace, true)?;

        let detected_class =
            (!s.has_key(KEY_BREWING_THRESHOLD)).then(|| LoadCellClass::from_factor(factor));
        let mut params = defaults;

        let threshold = match detected_class {
            Some(class) => class.default_brewing_threshold(),
            None => s.get_f32(KEY_BREWING_THRESHOLD, defaults.brewing_threshold),
        };
        if params.set_brewing_threshold(threshold).is_err() {
            warn_corrupt(KEY_BREWING_THRESHOLD, f64::from(threshold));
        }

        let timeout = s.get_u32(KEY_STABILITY_TIMEOUT, defaults.stability_timeout_ms);
        if params.set_stability_timeout_ms(timeout).is_err() {
            warn_corrupt(KEY_STABILITY_TIMEOUT, f64::from(timeout));
        }

        let median = s.get_i32(KEY_MEDIAN_SAMPLES, 3);
        let accepted = usize::try_from(median)
            .ok()
            .is_some_and(|n| params.set_median_samples(n).is_ok());
        if !accepted {
            warn_corrupt(KEY_MEDIAN_SAMPLES, f64::from(median));
        }

        let average = s.get_i32(KEY_AVERAGE_SAMPLES, 2);
        let accepted = usize::try_from(average)
            .ok()
            .is_some_and(|n| params.set_average_samples(n).is_ok());
        if !accepted {
            warn_corrupt(KEY_AVERAGE_SAMPLES, f64::from(average));
        }

        Ok(LoadedTuning {
            params,
            detected_class,
        })
    }
}

fn warn_corrupt(key: &str, value: f64) {
    tracing::warn!(key, value, "stored tuning value out of bounds, using default");
}
