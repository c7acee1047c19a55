//! Millisecond timestamp helpers shared by the filter and health tracking.

/// `now - since`, saturating at 0 when `since` lies in the future.
#[inline]
pub const fn elapsed_ms(now_ms: u64, since_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms)
}

/// True once strictly more than `window_ms` has passed since `since_ms`.
#[inline]
pub const fn elapsed_exceeds(now_ms: u64, since_ms: u64, window_ms: u64) -> bool {
    elapsed_ms(now_ms, since_ms) > window_ms
}

/// True while less than `window_ms` has passed since `since_ms`.
#[inline]
pub const fn within_window(now_ms: u64, since_ms: u64, window_ms: u64) -> bool {
    elapsed_ms(now_ms, since_ms) < window_ms
}
