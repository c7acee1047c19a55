//! Combining per-channel readings.
//!
//! Each channel is calibrated as if it alone carried the whole load, so the
//! total is the sum of the channels, never their mean. A single channel
//! passes through unchanged.

/// Sum of per-channel calibrated grams.
pub fn fuse_grams(channels: &[f32]) -> f32 {
    channels.iter().sum()
}

/// Sum of per-channel raw counts, widened so two full-scale 24-bit readings
/// cannot overflow.
pub fn fuse_raw(channels: &[i32]) -> i64 {
    channels.iter().copied().map(i64::from).sum()
}
