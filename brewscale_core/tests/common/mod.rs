#![allow(dead_code)]

use brewscale_core::Scale;
use brewscale_hardware::{MemoryStore, SimHandle, SimulatedLoadCell};
use brewscale_traits::ManualClock;

pub const DATA_LINES: [u8; 2] = [4, 6];
pub const CLOCK_LINE: u8 = 5;

/// A scale on simulated load cells, an inspectable store and a manual clock.
pub struct Rig {
    pub scale: Scale,
    pub cells: Vec<SimHandle>,
    pub store: MemoryStore,
    pub clock: ManualClock,
}

impl Rig {
    /// Advance past the sample interval and acquire.
    pub fn read(&mut self) -> f32 {
        self.clock.advance_ms(25);
        self.scale.get_filtered_weight()
    }

    /// Place `counts` (above the tared baseline) on channel `ch`.
    pub fn load(&self, ch: usize, counts: i32) {
        self.cells[ch].set_load_counts(counts);
    }

    /// Make raw counts equal the applied load (baseline and offset 0), so
    /// raw-count expectations read naturally.
    pub fn bare_counts(&self) {
        for c in &self.cells {
            c.set_baseline(0);
            c.set_offset(0);
        }
    }
}

/// One channel per factor, configured with `factor` on every channel.
pub fn rig_with_store(channels: usize, factor: f32, store: MemoryStore) -> Rig {
    let clock = ManualClock::new();
    let mut builder = Scale::builder()
        .with_clock_line(CLOCK_LINE)
        .with_calibration_factor(factor)
        .with_store(store.clone())
        .with_clock(Box::new(clock.clone()));
    let mut cells = Vec::new();
    for line in DATA_LINES.into_iter().take(channels) {
        let (cell, handle) = SimulatedLoadCell::with_handle();
        builder = builder.with_channel(line, cell);
        cells.push(handle);
    }
    let scale = builder.build().expect("valid rig");
    Rig {
        scale,
        cells,
        store,
        clock,
    }
}

pub fn rig(channels: usize, factor: f32) -> Rig {
    rig_with_store(channels, factor, MemoryStore::new())
}

/// An initialized rig.
pub fn connected(channels: usize, factor: f32) -> Rig {
    let mut r = rig(channels, factor);
    r.scale.initialize().expect("simulated cells respond");
    r
}
