//! Counts-per-gram calibration for one or two channels.

use brewscale_traits::KvStore;

use crate::error::ScaleError;
use crate::store::{StoreSession, storage_error};

/// Key of the single-channel factor.
pub const KEY_SINGLE: &str = "calib";
/// Keys of the per-channel factors in dual mode.
pub const KEY_CHANNEL_1: &str = "calib1";
pub const KEY_CHANNEL_2: &str = "calib2";

/// Calibration factor(s) in counts per gram.
///
/// In dual mode the combined (display) factor is always derived as the mean
/// of the two channel factors; it is never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationRecord {
    Single(f32),
    Dual(f32, f32),
}

impl CalibrationRecord {
    /// Both channels (or the only channel) set to `factor`.
    pub const fn uniform(factor: f32, dual: bool) -> Self {
        if dual {
            Self::Dual(factor, factor)
        } else {
            Self::Single(factor)
        }
    }

    pub const fn is_dual(&self) -> bool {
        matches!(self, Self::Dual(..))
    }

    pub const fn channel_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Dual(..) => 2,
        }
    }

    /// Combined factor: the single factor, or the mean of both channels.
    pub fn combined(&self) -> f32 {
        match *self {
            Self::Single(f) => f,
            Self::Dual(a, b) => (a + b) / 2.0,
        }
    }

    /// Factor of one channel (0-based).
    pub const fn factor(&self, channel: usize) -> Option<f32> {
        match (*self, channel) {
            (Self::Single(f), 0) | (Self::Dual(f, _), 0) | (Self::Dual(_, f), 1) => Some(f),
            _ => None,
        }
    }

    /// Apply one factor to every channel. Returns `Ok(false)` when every
    /// channel already uses `factor`.
    pub fn set_combined(&mut self, factor: f32) -> Result<bool, ScaleError> {
        check_factor(factor)?;
        let next = Self::uniform(factor, self.is_dual());
        if *self == next {
            return Ok(false);
        }
        *self = next;
        Ok(true)
    }

    /// Set distinct per-channel factors. In single mode only `first` is used.
    pub fn set_factors(&mut self, first: f32, second: f32) -> Result<bool, ScaleError> {
        match self {
            Self::Single(_) => self.set_combined(first),
            Self::Dual(a, b) => {
                check_factor(first)?;
                check_factor(second)?;
                *a = first;
                *b = second;
                Ok(true)
            }
        }
    }

    /// Persist the factor(s) for the current mode.
    pub fn save(&self, store: &mut dyn KvStore, namespace: &str) -> Result<(), ScaleError> {
        let mut s = StoreSession::open(store, namespace, false)?;
        match *self {
            Self::Single(f) => s.put_f32(KEY_SINGLE, f).map_err(storage_error)?,
            Self::Dual(a, b) => {
                s.put_f32(KEY_CHANNEL_1, a).map_err(storage_error)?;
                s.put_f32(KEY_CHANNEL_2, b).map_err(storage_error)?;
            }
        }
        Ok(())
    }

    /// Reload the factor(s) for the current mode.
    ///
    /// Absent keys fall back to `fallback`, the configured factor. Stored
    /// values that are zero or non-finite are ignored the same way.
    pub fn load(
        &self,
        store: &mut dyn KvStore,
        namespace: &str,
        fallback: f32,
    ) -> Result<Self, ScaleError> {
        let s = StoreSession::open(store, namespace, true)?;
        let read = |key: &str| {
            let v = s.get_f32(key, fallback);
            if check_factor(v).is_ok() {
                v
            } else {
                tracing::warn!(key, value = v, fallback, "ignoring unusable stored calibration");
                fallback
            }
        };
        Ok(match self {
            Self::Single(_) => Self::Single(read(KEY_SINGLE)),
            Self::Dual(..) => Self::Dual(read(KEY_CHANNEL_1), read(KEY_CHANNEL_2)),
        })
    }
}

pub(crate) fn check_factor(factor: f32) -> Result<(), ScaleError> {
    if factor.is_finite() && factor != 0.0 {
        Ok(())
    } else {
        Err(ScaleError::InvalidCalibration(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewscale_hardware::MemoryStore;

    #[test]
    fn combined_is_mean_in_dual_mode() {
        let c = CalibrationRecord::Dual(1000.0, 3000.0);
        assert_eq!(c.combined(), 2000.0);
        assert_eq!(CalibrationRecord::Single(420.0).combined(), 420.0);
    }

    #[test]
    fn set_combined_reports_unchanged() {
        let mut c = CalibrationRecord::Dual(1000.0, 1000.0);
        assert_eq!(c.set_combined(1000.0), Ok(false));
        assert_eq!(c.set_combined(1500.0), Ok(true));
        assert_eq!(c, CalibrationRecord::Dual(1500.0, 1500.0));
    }

    #[test]
    fn set_combined_evens_out_skewed_channels() {
        let mut c = CalibrationRecord::Dual(900.0, 1100.0);
        assert_eq!(c.combined(), 1000.0);
        assert_eq!(c.set_combined(1000.0), Ok(true));
        assert_eq!(c, CalibrationRecord::Dual(1000.0, 1000.0));
    }

    #[test]
    fn set_factors_in_single_mode_uses_first() {
        let mut c = CalibrationRecord::Single(1.0);
        assert_eq!(c.set_factors(7.0, 9.0), Ok(true));
        assert_eq!(c, CalibrationRecord::Single(7.0));
    }

    #[test]
    fn zero_and_nan_are_rejected() {
        let mut c = CalibrationRecord::Single(1.0);
        assert!(c.set_combined(0.0).is_err());
        assert!(c.set_factors(f32::NAN, 1.0).is_err());
        assert_eq!(c, CalibrationRecord::Single(1.0));
    }

    #[test]
    fn load_without_record_uses_fallback() {
        let mut store = MemoryStore::new();
        let c = CalibrationRecord::Dual(0.5, 0.5)
            .load(&mut store, "scale", 1234.0)
            .unwrap();
        assert_eq!(c, CalibrationRecord::Dual(1234.0, 1234.0));
        assert!(!store.is_open());
    }

    #[test]
    fn corrupt_stored_factor_falls_back() {
        let mut store = MemoryStore::new();
        store.seed_f32("scale", KEY_SINGLE, 0.0);
        let c = CalibrationRecord::Single(1.0)
            .load(&mut store, "scale", 2000.0)
            .unwrap();
        assert_eq!(c, CalibrationRecord::Single(2000.0));
    }
}
