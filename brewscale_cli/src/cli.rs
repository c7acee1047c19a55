//! CLI argument definitions and shared statics.

use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "brewscale", version, about = "Load-cell scale CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/brewscale.toml")]
    pub config: PathBuf,

    /// Log and print as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream filtered weight readings
    Watch {
        /// Number of readings to print
        #[arg(long, default_value_t = 50)]
        count: u32,
        /// Pause between readings in ms
        #[arg(long = "interval-ms", value_name = "MS", default_value_t = 100)]
        interval_ms: u64,
    },
    /// Print connection, health, calibration and tuning
    Status,
    /// Zero the scale
    Tare {
        /// Conversions averaged per channel (default: tare.repetitions)
        #[arg(long)]
        times: Option<u8>,
    },
    /// Set and persist the calibration factor(s)
    #[command(group(ArgGroup::new("factor_source").required(true).args(["factor", "factors"])))]
    Calibrate {
        /// One factor (counts per gram) applied to every channel
        #[arg(long, value_name = "COUNTS_PER_G", allow_negative_numbers = true)]
        factor: Option<f32>,
        /// Per-channel factors for dual load cells
        #[arg(
            long,
            num_args = 2,
            value_names = ["FIRST", "SECOND"],
            allow_negative_numbers = true
        )]
        factors: Option<Vec<f32>>,
    },
    /// Adjust and persist the adaptive filter tuning
    Tune {
        /// Weight change (g) that counts as activity
        #[arg(long = "brewing-threshold", value_name = "GRAMS")]
        brewing_threshold: Option<f32>,
        /// Quiet time (ms) before BREWING relaxes to TRANSITIONING
        #[arg(long = "stability-timeout-ms", value_name = "MS")]
        stability_timeout_ms: Option<u32>,
        /// Median window used while brewing
        #[arg(long = "median-samples", value_name = "N")]
        median_samples: Option<usize>,
        /// Averaging window used while stable
        #[arg(long = "average-samples", value_name = "N")]
        average_samples: Option<usize>,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
