//! Fixed-capacity history of calibrated readings feeding both filters.

/// Capacity of the sample history.
pub const MAX_SAMPLES: usize = 10;

/// Ring buffer of the most recent `N` calibrated readings (grams).
///
/// Until [`initialize`](Self::initialize) has run the contents are
/// meaningless; callers check [`is_initialized`](Self::is_initialized).
#[derive(Debug, Clone)]
pub struct SampleHistory<const N: usize = MAX_SAMPLES> {
    slots: [f32; N],
    cursor: usize,
    initialized: bool,
}

impl<const N: usize> Default for SampleHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleHistory<N> {
    pub const fn new() -> Self {
        Self {
            slots: [0.0; N],
            cursor: 0,
            initialized: false,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Fill every slot with `value` and mark the history initialized.
    pub fn initialize(&mut self, value: f32) {
        self.slots = [value; N];
        self.initialized = true;
    }

    /// Mark the history stale; the next reading reseeds it.
    pub fn invalidate(&mut self) {
        self.initialized = false;
    }

    /// Overwrite the oldest slot.
    pub fn push(&mut self, value: f32) {
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % N;
    }

    /// The `i`-th most recent reading (`0` = newest). `i` wraps modulo `N`.
    pub fn recent(&self, i: usize) -> f32 {
        self.slots[(self.cursor + N - 1 - (i % N)) % N]
    }

    /// Median of the `n` most recent readings, `n` clamped to `1..=N`.
    ///
    /// The window is copied and re-sorted on every call. For an even `n`
    /// the upper of the two middle elements is returned.
    pub fn median(&self, n: usize) -> f32 {
        let n = n.clamp(1, N);
        let mut tmp = [0.0f32; N];
        for (i, slot) in tmp.iter_mut().take(n).enumerate() {
            *slot = self.recent(i);
        }
        let window = &mut tmp[..n];
        window.sort_unstable_by(f32::total_cmp);
        window[n / 2]
    }

    /// Arithmetic mean of the `n` most recent readings, `n` clamped to `1..=N`.
    pub fn average(&self, n: usize) -> f32 {
        let n = n.clamp(1, N);
        let sum: f32 = (0..n).map(|i| self.recent(i)).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = n as f32;
        sum / count
    }
}
