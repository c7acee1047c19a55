//! Bit-banged HX711 over Raspberry Pi GPIO.
//!
//! Two HX711 boards may share one SCK line; they then share a [`ClockBus`]
//! and the caller serializes access (the scale never clocks two channels at
//! once).

use std::cell::RefCell;
use std::rc::Rc;
use brewscale_traits::{BoxError, LoadCell, MonotonicClock};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{ReadyWait, sign_extend_24};

/// Gain/channel selection, encoded as the number of extra SCK pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    A128 = 25,
    B32 = 26,
    A64 = 27,
}

/// A clock (SCK) output shared by one or more HX711 channels.
#[derive(Clone)]
pub struct ClockBus {
    line: u8,
    pin: Rc<RefCell<OutputPin>>,
}

impl ClockBus {
    pub fn open(gpio: &Gpio, line: u8) -> Result<Self> {
        let mut pin = gpio
            .get(line)
            .map_err(|e| HwError::Gpio(format!("open sck {line}: {e}")))?
            .into_output();
        pin.set_low(); // clock idle low
        Ok(Self {
            line,
            pin: Rc::new(RefCell::new(pin)),
        })
    }

    pub fn line(&self) -> u8 {
        self.line
    }
}

pub struct Hx711 {
    gpio: Gpio,
    bus: ClockBus,
    dt: Option<InputPin>,
    gain: Gain,
    offset: i32,
    scale: f32,
    ready: ReadyWait,
}

impl Hx711 {
    pub fn new(gpio: Gpio, bus: ClockBus, gain: Gain, ready: ReadyWait) -> Self {
        Self {
            gpio,
            bus,
            dt: None,
            gain,
            offset: 0,
            scale: 1.0,
            ready,
        }
    }

    /// Open the GPIO chip and one HX711 per channel, all on `clock_line`.
    /// Data lines are bound later by `LoadCell::begin`.
    pub fn open_shared(
        clock_line: u8,
        channels: usize,
        gain: Gain,
        ready: ReadyWait,
    ) -> Result<Vec<Self>> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let bus = ClockBus::open(&gpio, clock_line)?;
        Ok((0..channels)
            .map(|_| Self::new(gpio.clone(), bus.clone(), gain, ready))
            .collect())
    }

    fn read_once(&mut self) -> Result<i32> {
        let dt = self.dt.as_ref().ok_or(HwError::NotBound)?;

        // DT goes low when a conversion is ready
        let busy = self.ready.wait(&MonotonicClock, || dt.is_low())?;
        if busy > 0 {
            trace!(busy, "hx711 waited for data ready");
        }

        let mut sck = self.bus.pin.borrow_mut();
        // Clock out 24 bits
        let mut value: u32 = 0;
        for _ in 0..24 {
            sck.set_high();
            spin_delay_100ns();
            value = (value << 1) | u32::from(dt.is_high());
            sck.set_low();
            spin_delay_100ns();
        }

        // Pulse gain to set next measurement
        for _ in 24..(self.gain as u8) {
            sck.set_high();
            spin_delay_100ns();
            sck.set_low();
            spin_delay_100ns();
        }

        let raw = sign_extend_24(value);
        trace!(raw, "hx711 raw read");
        Ok(raw)
    }

    fn read_average(&mut self, samples: u8) -> Result<f64> {
        let n = samples.max(1);
        let mut sum = 0i64;
        for _ in 0..n {
            sum += i64::from(self.read_once()?);
        }
        Ok(sum as f64 / f64::from(n))
    }
}

impl LoadCell for Hx711 {
    fn begin(&mut self, data_line: u8, clock_line: u8) -> std::result::Result<(), BoxError> {
        if clock_line != self.bus.line() {
            return Err(Box::new(HwError::Gpio(format!(
                "clock line {clock_line} does not match bus line {}",
                self.bus.line()
            ))));
        }
        let dt = self
            .gpio
            .get(data_line)
            .map_err(|e| HwError::Gpio(format!("open dt {data_line}: {e}")))?
            .into_input();
        self.dt = Some(dt);
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        self.dt.as_ref().is_some_and(|dt| dt.is_low())
    }

    fn read_raw_count(&mut self) -> std::result::Result<i32, BoxError> {
        Ok(self.read_once()?)
    }

    fn read_calibrated_units(&mut self, samples: u8) -> std::result::Result<f32, BoxError> {
        let avg = self.read_average(samples)?;
        Ok(((avg - f64::from(self.offset)) / f64::from(self.scale)) as f32)
    }

    fn zero(&mut self, repetitions: u8) -> std::result::Result<(), BoxError> {
        let avg = self.read_average(repetitions)?;
        self.offset = avg.round() as i32;
        trace!(offset = self.offset, "hx711 zeroed");
        Ok(())
    }

    fn set_scale_factor(&mut self, factor: f32) {
        self.scale = factor;
    }
}

#[inline(always)]
fn spin_delay_100ns() {
    // A few CPU cycles; the HX711 needs >= 0.1 us per SCK level.
    std::hint::spin_loop();
}
