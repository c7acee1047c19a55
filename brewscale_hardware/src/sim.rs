//! Simulated load cell.
//!
//! Models an HX711 channel as `raw = baseline + load_counts`. `zero()` captures
//! the current raw value as offset, so a simulated platform tared empty reads
//! exactly `load_counts / factor` units afterwards. A cloned [`SimHandle`]
//! shares state with the cell so tests (and the CLI's simulated pour) can
//! steer it after the cell has been moved into a scale.

use std::cell::RefCell;
use std::rc::Rc;

use brewscale_traits::{BoxError, LoadCell};

use crate::error::HwError;

/// Raw reading of an unloaded simulated platform. Non-zero so that
/// initialization test reads succeed.
pub const DEFAULT_BASELINE_COUNTS: i32 = 8_000;

#[derive(Debug)]
struct SimState {
    baseline: i32,
    load_counts: i32,
    ready: bool,
    not_ready_polls: u32,
    nan: bool,
    fail_begin: bool,
    offset: i32,
    scale_factor: f32,
    lines: Option<(u8, u8)>,
    zero_calls: u32,
    last_zero_repetitions: u8,
    raw_reads: u32,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE_COUNTS,
            load_counts: 0,
            ready: true,
            not_ready_polls: 0,
            nan: false,
            fail_begin: false,
            offset: 0,
            scale_factor: 1.0,
            lines: None,
            zero_calls: 0,
            last_zero_repetitions: 0,
            raw_reads: 0,
        }
    }
}

impl SimState {
    fn raw(&self) -> i32 {
        self.baseline.saturating_add(self.load_counts)
    }
}

/// Simulated load cell implementation
#[derive(Debug, Default)]
pub struct SimulatedLoadCell {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedLoadCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cell together with a handle that steers it.
    pub fn with_handle() -> (Self, SimHandle) {
        let cell = Self::new();
        let handle = cell.handle();
        (cell, handle)
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Rc::clone(&self.state),
        }
    }
}

impl LoadCell for SimulatedLoadCell {
    fn begin(&mut self, data_line: u8, clock_line: u8) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.fail_begin {
            return Err(Box::new(HwError::Gpio(format!(
                "simulated: data line {data_line} unavailable"
            ))));
        }
        s.lines = Some((data_line, clock_line));
        tracing::trace!(data_line, clock_line, "simulated load cell bound");
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        let mut s = self.state.borrow_mut();
        if s.not_ready_polls > 0 {
            s.not_ready_polls -= 1;
            return false;
        }
        s.ready
    }

    fn read_raw_count(&mut self) -> Result<i32, BoxError> {
        let mut s = self.state.borrow_mut();
        if s.lines.is_none() {
            return Err(Box::new(HwError::NotBound));
        }
        s.raw_reads = s.raw_reads.saturating_add(1);
        Ok(s.raw())
    }

    fn read_calibrated_units(&mut self, _samples: u8) -> Result<f32, BoxError> {
        let s = self.state.borrow();
        if s.lines.is_none() {
            return Err(Box::new(HwError::NotBound));
        }
        if s.nan {
            return Ok(f32::NAN);
        }
        // Every simulated conversion is identical, so averaging is a no-op.
        let counts = f64::from(s.raw()) - f64::from(s.offset);
        Ok((counts / f64::from(s.scale_factor)) as f32)
    }

    fn zero(&mut self, repetitions: u8) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        if s.lines.is_none() {
            return Err(Box::new(HwError::NotBound));
        }
        s.offset = s.raw();
        s.zero_calls = s.zero_calls.saturating_add(1);
        s.last_zero_repetitions = repetitions;
        Ok(())
    }

    fn set_scale_factor(&mut self, factor: f32) {
        self.state.borrow_mut().scale_factor = factor;
    }
}

/// Shared control surface of a [`SimulatedLoadCell`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Rc<RefCell<SimState>>,
}

impl SimHandle {
    /// Counts added on top of the baseline by whatever sits on the platform.
    pub fn set_load_counts(&self, counts: i32) {
        self.state.borrow_mut().load_counts = counts;
    }

    /// Place `grams` on the platform, converted with the current scale factor.
    pub fn set_load_grams(&self, grams: f32) {
        let mut s = self.state.borrow_mut();
        s.load_counts = (f64::from(grams) * f64::from(s.scale_factor)).round() as i32;
    }

    pub fn set_baseline(&self, counts: i32) {
        self.state.borrow_mut().baseline = counts;
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.borrow_mut().ready = ready;
    }

    /// Report not-ready for the next `polls` calls to `is_ready()`.
    pub fn not_ready_for(&self, polls: u32) {
        self.state.borrow_mut().not_ready_polls = polls;
    }

    /// Make calibrated reads return NaN (glitching converter).
    pub fn set_nan(&self, nan: bool) {
        self.state.borrow_mut().nan = nan;
    }

    pub fn fail_begin(&self, fail: bool) {
        self.state.borrow_mut().fail_begin = fail;
    }

    pub fn set_offset(&self, offset: i32) {
        self.state.borrow_mut().offset = offset;
    }

    pub fn raw(&self) -> i32 {
        self.state.borrow().raw()
    }

    pub fn offset(&self) -> i32 {
        self.state.borrow().offset
    }

    pub fn scale_factor(&self) -> f32 {
        self.state.borrow().scale_factor
    }

    pub fn lines(&self) -> Option<(u8, u8)> {
        self.state.borrow().lines
    }

    pub fn zero_calls(&self) -> u32 {
        self.state.borrow().zero_calls
    }

    pub fn last_zero_repetitions(&self) -> u8 {
        self.state.borrow().last_zero_repetitions
    }

    pub fn raw_reads(&self) -> u32 {
        self.state.borrow().raw_reads
    }
}
