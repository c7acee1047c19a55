use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("scale not connected: initialize() has not succeeded")]
    NotConnected,
    #[error("no non-zero test reading from data line(s) {failed_lines:?} within the init timeout")]
    InitializationFailed { failed_lines: Vec<u8> },
    #[error("invalid calibration factor: {0} (must be finite and non-zero)")]
    InvalidCalibration(f32),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for load cell")]
    Timeout,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Rejection from the validate-and-apply step of a tuning setter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TuningError {
    #[error("{param} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        param: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing load cell channel")]
    MissingChannel,
    #[error("at most two load cell channels are supported, got {0}")]
    TooManyChannels(usize),
    #[error("missing key/value store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
