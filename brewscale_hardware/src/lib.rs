//! Concrete collaborators for the brewscale engine: load-cell drivers and
//! key/value store backends.

pub mod error;
pub mod sim;
pub mod storage;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hx711;

pub use error::HwError;
pub use sim::{SimHandle, SimulatedLoadCell};
pub use storage::{FileStore, MemoryStore};
