//! Human-readable error descriptions and structured JSON error formatting.

use brewscale_core::error::{BuildError, ScaleError, TuningError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingChannel => {
                "What happened: No load cell was configured.\nLikely causes: sensor.data_lines is empty.\nHow to fix: List one or two data lines under [sensor] in the config.".to_string()
            }
            BuildError::TooManyChannels(n) => format!(
                "What happened: {n} load cells were configured.\nLikely causes: sensor.data_lines lists more than two lines.\nHow to fix: Use one data line (single) or two (dual sharing the clock line)."
            ),
            BuildError::MissingStore => {
                "What happened: No key/value store was provided to the scale.\nLikely causes: The store was not wired into the builder.\nHow to fix: Pass a store via with_store(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::InitializationFailed { failed_lines } => format!(
                "What happened: Load cell on data line(s) {failed_lines:?} gave no reading during initialization.\nLikely causes: HX711 not powered, DT/SCK swapped, or wrong line numbers.\nHow to fix: Check wiring and [sensor] data_lines/clock_line, or raise sensor.init_timeout_ms."
            ),
            ScaleError::NotConnected => {
                "What happened: The scale is not connected.\nLikely causes: Initialization did not succeed.\nHow to fix: Run `brewscale self-check` and fix the reported problem first.".to_string()
            }
            ScaleError::InvalidCalibration(f) => format!(
                "What happened: Calibration factor {f} was rejected.\nLikely causes: Zero or non-finite value.\nHow to fix: Pass a non-zero factor in counts per gram (e.g. `brewscale calibrate --factor 2000`)."
            ),
            ScaleError::Timeout => {
                "What happened: Load cell read timed out.\nLikely causes: HX711 not wired correctly or no power/ground.\nHow to fix: Verify DT/SCK lines and power.".to_string()
            }
            ScaleError::Storage(msg) => format!(
                "What happened: Persistent storage failed ({msg}).\nLikely causes: storage.path is not writable or the file is corrupt.\nHow to fix: Check permissions on the storage file or remove it to start fresh."
            ),
            ScaleError::Hardware(msg) | ScaleError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Incorrect line numbers or insufficient GPIO permissions.\nHow to fix: Fix [sensor] in the config; ensure the process may access GPIO."
            ),
        };
    }

    if let Some(TuningError::OutOfRange {
        param,
        value,
        min,
        max,
    }) = err.downcast_ref::<TuningError>()
    {
        return format!(
            "What happened: {param} = {value} was rejected.\nLikely causes: The value is outside the accepted range.\nHow to fix: Choose a value between {min} and {max}."
        );
    }

    // String-based heuristics for errors coming from config or hardware setup
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path.\nHow to fix: Pass --config <FILE>. Details: {msg}"
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Missing [sensor] section or a mistyped key.\nHow to fix: Compare with etc/brewscale.toml. Details: {msg}"
        );
    }

    if lower.starts_with("sensor.")
        || lower.starts_with("filter.")
        || lower.starts_with("tare.")
        || lower.starts_with("health.")
        || lower.starts_with("storage.")
        || lower.starts_with("logging.")
    {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if lower.contains("open hx711") || lower.contains("open gpio") {
        return "What happened: Failed to initialize hardware lines.\nLikely causes: Incorrect line numbers or insufficient GPIO permissions.\nHow to fix: Fix [sensor] in the config; ensure the process has permission to access GPIO.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Error: {msg}"
    )
}

/// Stable name of the error kind, used as `reason` in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::NotConnected => "NotConnected",
            ScaleError::InitializationFailed { .. } => "InitializationFailed",
            ScaleError::InvalidCalibration(_) => "InvalidCalibration",
            ScaleError::Hardware(_) | ScaleError::HardwareFault(_) => "Hardware",
            ScaleError::Timeout => "Timeout",
            ScaleError::Storage(_) => "Storage",
        };
    }
    if err.downcast_ref::<TuningError>().is_some() {
        return "TuningRejected";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    "Error"
}

/// Map typed scale errors to stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "InitializationFailed" => 3,
        "NotConnected" => 4,
        "InvalidCalibration" => 5,
        "TuningRejected" => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let reason = reason_name(err);
    let details = match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::InitializationFailed { failed_lines }) => {
            Some(json!({ "failed_lines": failed_lines }))
        }
        Some(ScaleError::InvalidCalibration(f)) => Some(json!({ "factor": f })),
        _ => match err.downcast_ref::<TuningError>() {
            Some(TuningError::OutOfRange {
                param,
                value,
                min,
                max,
            }) => Some(json!({ "param": param, "value": value, "min": min, "max": max })),
            None => None,
        },
    };

    let obj = if let Some(d) = details {
        json!({ "reason": reason, "details": d, "message": msg })
    } else {
        json!({ "reason": reason, "message": msg })
    };
    obj.to_string()
}
