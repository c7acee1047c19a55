//! Collaborator seams for the brewscale acquisition engine.
//!
//! Everything the engine talks to that it does not own lives behind one of
//! these traits: the load-cell ADC, the persistent key/value store, the
//! flow-rate consumer that must be paused while taring, and the clock.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type used at every trait boundary in this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Capability set of a bridge-amplifier ADC channel (HX711 and friends).
///
/// One instance drives exactly one data line. Two instances may share a
/// clock line; callers are responsible for serializing access.
pub trait LoadCell {
    /// Bind the driver to its data line and (possibly shared) clock line.
    fn begin(&mut self, data_line: u8, clock_line: u8) -> Result<(), BoxError>;

    /// True when a conversion is ready to be clocked out.
    fn is_ready(&mut self) -> bool;

    /// Latest raw conversion in counts. Callers check `is_ready()` first;
    /// the value is stale or undefined otherwise.
    fn read_raw_count(&mut self) -> Result<i32, BoxError>;

    /// Average of `samples` conversions, offset-corrected and divided by the
    /// scale factor.
    fn read_calibrated_units(&mut self, samples: u8) -> Result<f32, BoxError>;

    /// Average `repetitions` conversions and store the result as the new offset.
    fn zero(&mut self, repetitions: u8) -> Result<(), BoxError>;

    /// Counts per unit used by `read_calibrated_units`.
    fn set_scale_factor(&mut self, factor: f32);
}

impl<T: LoadCell + ?Sized> LoadCell for Box<T> {
    fn begin(&mut self, data_line: u8, clock_line: u8) -> Result<(), BoxError> {
        (**self).begin(data_line, clock_line)
    }
    fn is_ready(&mut self) -> bool {
        (**self).is_ready()
    }
    fn read_raw_count(&mut self) -> Result<i32, BoxError> {
        (**self).read_raw_count()
    }
    fn read_calibrated_units(&mut self, samples: u8) -> Result<f32, BoxError> {
        (**self).read_calibrated_units(samples)
    }
    fn zero(&mut self, repetitions: u8) -> Result<(), BoxError> {
        (**self).zero(repetitions)
    }
    fn set_scale_factor(&mut self, factor: f32) {
        (**self).set_scale_factor(factor)
    }
}

/// Namespaced scalar key/value store (NVS-style).
///
/// Every logical operation opens the namespace, reads or writes, then closes
/// it again. Getters return `default` when the key is absent.
pub trait KvStore {
    fn open(&mut self, namespace: &str, read_only: bool) -> Result<(), BoxError>;
    fn close(&mut self);

    fn has_key(&self, key: &str) -> bool;

    fn get_f32(&self, key: &str, default: f32) -> f32;
    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), BoxError>;

    fn get_i32(&self, key: &str, default: i32) -> i32;
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), BoxError>;

    fn get_u32(&self, key: &str, default: u32) -> u32;
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), BoxError>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn open(&mut self, namespace: &str, read_only: bool) -> Result<(), BoxError> {
        (**self).open(namespace, read_only)
    }
    fn close(&mut self) {
        (**self).close()
    }
    fn has_key(&self, key: &str) -> bool {
        (**self).has_key(key)
    }
    fn get_f32(&self, key: &str, default: f32) -> f32 {
        (**self).get_f32(key, default)
    }
    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        (**self).put_f32(key, value)
    }
    fn get_i32(&self, key: &str, default: i32) -> i32 {
        (**self).get_i32(key, default)
    }
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), BoxError> {
        (**self).put_i32(key, value)
    }
    fn get_u32(&self, key: &str, default: u32) -> u32 {
        (**self).get_u32(key, default)
    }
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), BoxError> {
        (**self).put_u32(key, value)
    }
}

/// Downstream flow-rate integrator. Both calls are fire-and-forget and are
/// assumed to take effect before they return.
pub trait FlowRateHook {
    fn pause_calculation(&self);
    fn resume_calculation(&self);
}
