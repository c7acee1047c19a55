#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Load-cell weight acquisition and adaptive filtering (hardware-agnostic).
//!
//! All hardware interactions go through the `brewscale_traits` seams:
//! `LoadCell` for the ADC channels, `KvStore` for persistence, `FlowRateHook`
//! for the consumer paused during tare, and `Clock` for every timestamp and
//! bounded wait.
//!
//! ## Architecture
//!
//! - **Raw sensor reader**: one or two channels on a shared clock line (`reader`)
//! - **Calibration**: counts-per-gram factors and their persistence (`calibration`)
//! - **Fusion**: per-channel grams and raw counts are summed (`fusion`)
//! - **Sample history**: fixed ring buffer feeding both filters (`buffer`)
//! - **Filter selector**: STABLE / BREWING / TRANSITIONING picks median vs. average (`filter`)
//! - **Tuning**: bounded filter parameters and first-boot defaults (`tuning`)
//! - **Health**: connection latch and recent-activity status (`health`)
//! - **Facade**: `Scale`, including tare, built with `ScaleBuilder`
//!
//! ## Filtering
//!
//! Every accepted reading is compared with the previous filtered weight.
//! Deltas above the brewing threshold mean liquid is flowing, and the median
//! of the last few readings is used to reject spikes. Otherwise the mean of
//! the last few readings gives a smooth, low-latency value. A jump larger
//! than the step override bypasses both filters and reseeds the history.

// Module declarations
pub mod buffer;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod health;
pub mod hw_error;
pub mod mocks;
pub mod reader;
pub mod scale;
pub mod store;
pub mod tuning;
pub mod util;

pub use buffer::{MAX_SAMPLES, SampleHistory};
pub use builder::ScaleBuilder;
pub use calibration::CalibrationRecord;
pub use config::{ScaleTiming, TareCfg};
pub use error::{BuildError, Result, ScaleError, TuningError};
pub use filter::{FilterSelector, FilterState, SelectorParams, Transition};
pub use health::{HealthMonitor, HealthStatus};
pub use scale::Scale;
pub use tuning::{LoadCellClass, TuningParameters};
