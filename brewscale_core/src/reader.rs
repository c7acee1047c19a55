//! Raw sensor reader: one or two load-cell channels on a shared clock line.

use std::time::Duration;

use brewscale_traits::{Clock, LoadCell};

use crate::calibration::CalibrationRecord;
use crate::error::ScaleError;
use crate::hw_error::map_hw_error;

/// Repetitions of the zeroing performed at the end of initialization.
pub const INIT_ZERO_REPETITIONS: u8 = 10;

pub struct Channel {
    data_line: u8,
    cell: Box<dyn LoadCell>,
}

impl Channel {
    pub fn new(data_line: u8, cell: Box<dyn LoadCell>) -> Self {
        Self {
            data_line,
            cell,
        }
    }

    pub const fn data_line(&self) -> u8 {
        self.data_line
    }

    pub fn is_ready(&mut self) -> bool {
        self.cell.is_ready()
    }

    pub fn read_raw(&mut self) -> Result<i32, ScaleError> {
        let raw = self
            .cell
            .read_raw_count()
            .map_err(|e| map_hw_error(e.as_ref()))?;
        tracing::trace!(data_line = self.data_line, raw, "raw read");
        Ok(raw)
    }

    pub fn read_grams(&mut self) -> Result<f32, ScaleError> {
        self.cell
            .read_calibrated_units(1)
            .map_err(|e| map_hw_error(e.as_ref()))
    }

    fn zero(&mut self, repetitions: u8) -> Result<(), ScaleError> {
        self.cell
            .zero(repetitions)
            .map_err(|e| map_hw_error(e.as_ref()))
    }
}

impl core::fmt::Debug for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Channel")
            .field("data_line", &self.data_line)
            .finish_non_exhaustive()
    }
}

/// The one or two channels of a scale. All fusion and calibration logic
/// iterates this set, so single mode is simply a set of one.
#[derive(Debug)]
pub struct ChannelBank {
    channels: Vec<Channel>,
    clock_line: u8,
}

impl ChannelBank {
    pub fn new(clock_line: u8, channels: Vec<Channel>) -> Self {
        Self {
            channels,
            clock_line,
        }
    }

    pub fn is_dual(&self) -> bool {
        self.channels.len() == 2
    }

    pub const fn clock_line(&self) -> u8 {
        self.clock_line
    }

    pub fn data_lines(&self) -> Vec<u8> {
        self.channels.iter().map(Channel::data_line).collect()
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// Bind every channel to its lines and hand it its scale factor.
    pub fn begin(&mut self, calibration: &CalibrationRecord) -> Result<(), ScaleError> {
        let clock_line = self.clock_line;
        for ch in &mut self.channels {
            ch.cell
                .begin(ch.data_line, clock_line)
                .map_err(|e| map_hw_error(e.as_ref()))?;
        }
        self.apply_calibration(calibration);
        Ok(())
    }

    pub fn apply_calibration(&mut self, calibration: &CalibrationRecord) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if let Some(f) = calibration.factor(i) {
                ch.cell.set_scale_factor(f);
            }
        }
    }

    /// Poll every channel until each has produced a non-zero raw reading or
    /// `timeout` elapses.
    ///
    /// Channels are tested opportunistically: each poll checks every channel
    /// that has not passed yet, so one slow channel does not stall the other.
    pub fn await_test_readings(
        &mut self,
        clock: &dyn Clock,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), ScaleError> {
        let start = clock.now();
        let mut passed = vec![false; self.channels.len()];
        while clock.now().saturating_duration_since(start) < timeout {
            for (ch, ok) in self.channels.iter_mut().zip(passed.iter_mut()) {
                if *ok || !ch.is_ready() {
                    continue;
                }
                match ch.read_raw() {
                    Ok(raw) if raw != 0 => {
                        tracing::info!(data_line = ch.data_line, raw, "load cell responding");
                        *ok = true;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!(data_line = ch.data_line, error = %e, "test read failed"),
                }
            }
            if passed.iter().all(|ok| *ok) {
                return Ok(());
            }
            clock.sleep(poll);
        }

        let failed_lines: Vec<u8> = self
            .channels
            .iter()
            .zip(&passed)
            .filter(|(_, ok)| !**ok)
            .map(|(ch, _)| ch.data_line)
            .collect();
        for ch in &self.channels {
            let ok = !failed_lines.contains(&ch.data_line);
            tracing::error!(
                data_line = ch.data_line,
                status = if ok { "OK" } else { "FAILED" },
                "load cell initialization"
            );
        }
        Err(ScaleError::InitializationFailed { failed_lines })
    }

    /// Zero every channel, strictly one after the other, pausing `gap`
    /// between channels so they never contend for the shared clock line.
    pub fn zero_all(
        &mut self,
        repetitions: u8,
        clock: &dyn Clock,
        gap: Duration,
    ) -> Result<(), ScaleError> {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if i > 0 {
                clock.sleep(gap);
            }
            ch.zero(repetitions)?;
        }
        Ok(())
    }

    /// True when every channel has a conversion ready.
    pub fn all_ready(&mut self) -> bool {
        self.channels.iter_mut().all(Channel::is_ready)
    }

    /// One calibrated reading per channel, in channel order.
    pub fn read_grams(&mut self) -> Result<Vec<f32>, ScaleError> {
        self.channels.iter_mut().map(Channel::read_grams).collect()
    }

    /// One raw count per channel, in channel order.
    pub fn read_raw(&mut self) -> Result<Vec<i32>, ScaleError> {
        self.channels.iter_mut().map(Channel::read_raw).collect()
    }
}
