//! Scale commands: hardware assembly and command execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use brewscale_config::Config;
use brewscale_core::{Scale, ScaleBuilder, TuningParameters};
use brewscale_hardware::{FileStore, MemoryStore, SimHandle};
use eyre::WrapErr;
use serde_json::json;

/// Grams added to the first simulated channel before every `watch` reading.
pub const SIM_POUR_ENV: &str = "BREWSCALE_SIM_POUR_G";
/// Data line of a simulated load cell that never reports ready.
pub const SIM_DEAD_LINE_ENV: &str = "BREWSCALE_SIM_DEAD_LINE";

/// An initialized scale plus the handles of its simulated cells (empty on
/// real hardware).
pub struct Rig {
    pub scale: Scale,
    pub sim: Vec<SimHandle>,
}

fn emit(json_mode: bool, value: &serde_json::Value, text: &str) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{text}");
    }
}

fn with_store(builder: ScaleBuilder, cfg: &Config) -> ScaleBuilder {
    match &cfg.storage.path {
        Some(path) => builder.with_store(FileStore::new(path)),
        None => {
            tracing::warn!("storage.path not set; calibration and tuning are kept in memory only");
            builder.with_store(MemoryStore::new())
        }
    }
}

#[cfg(not(feature = "hardware"))]
fn with_cells(mut builder: ScaleBuilder, cfg: &Config) -> eyre::Result<(ScaleBuilder, Vec<SimHandle>)> {
    use brewscale_hardware::SimulatedLoadCell;

    let dead_line = match std::env::var(SIM_DEAD_LINE_ENV) {
        Ok(v) => Some(
            v.parse::<u8>()
                .wrap_err_with(|| format!("{SIM_DEAD_LINE_ENV} must be a data line number"))?,
        ),
        Err(_) => None,
    };
    let mut handles = Vec::new();
    for &line in &cfg.sensor.data_lines {
        let (cell, handle) = SimulatedLoadCell::with_handle();
        if dead_line == Some(line) {
            handle.set_ready(false);
        }
        builder = builder.with_channel(line, cell);
        handles.push(handle);
    }
    Ok((builder, handles))
}

#[cfg(feature = "hardware")]
fn with_cells(mut builder: ScaleBuilder, cfg: &Config) -> eyre::Result<(ScaleBuilder, Vec<SimHandle>)> {
    use brewscale_hardware::hx711::{Gain, Hx711};
    use brewscale_hardware::util::ReadyWait;

    let cells = Hx711::open_shared(
        cfg.sensor.clock_line,
        cfg.sensor.data_lines.len(),
        Gain::A128,
        ReadyWait::default(),
    )
    .wrap_err("open hx711")?;
    for (&line, cell) in cfg.sensor.data_lines.iter().zip(cells) {
        builder = builder.with_channel(line, cell);
    }
    Ok((builder, Vec::new()))
}

/// Build the scale from config and bring it up.
pub fn open_scale(cfg: &Config) -> eyre::Result<Rig> {
    let builder = with_store(Scale::builder().with_config(cfg), cfg);
    let (builder, sim) = with_cells(builder, cfg)?;
    let mut scale = builder.build()?;
    scale.initialize().map_err(eyre::Report::new)?;
    Ok(Rig { scale, sim })
}

fn tuning_json(t: &TuningParameters) -> serde_json::Value {
    json!({
        "brewing_threshold_g": t.brewing_threshold,
        "stability_timeout_ms": t.stability_timeout_ms,
        "median_samples": t.median_samples,
        "average_samples": t.average_samples,
    })
}

fn channel_factors(scale: &Scale) -> Vec<f32> {
    (0..scale.calibration().channel_count())
        .filter_map(|ch| scale.channel_factor(ch))
        .collect()
}

/// Print filtered readings until `count` is reached or Ctrl-C.
pub fn run_watch(rig: &mut Rig, count: u32, interval_ms: u64, json_mode: bool) -> eyre::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .wrap_err("install Ctrl-C handler")?;
    }

    let pour_step = match std::env::var(SIM_POUR_ENV) {
        Ok(v) => v
            .parse::<f32>()
            .wrap_err_with(|| format!("{SIM_POUR_ENV} must be grams per reading"))?,
        Err(_) => 0.0,
    };
    let mut poured = 0.0f32;
    let interval = Duration::from_millis(interval_ms);

    for i in 0..count {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!(readings = i, "watch interrupted");
            break;
        }
        std::thread::sleep(interval);
        if let Some(first) = rig.sim.first()
            && pour_step != 0.0
        {
            poured += pour_step;
            first.set_load_grams(poured);
        }
        let weight = rig.scale.get_filtered_weight();
        let state = rig.scale.filter_state_name();
        emit(
            json_mode,
            &json!({ "reading": i, "weight_g": weight, "state": state }),
            &format!("{weight:>9.2} g  {state}"),
        );
    }
    Ok(())
}

pub fn run_status(rig: &Rig, json_mode: bool) -> eyre::Result<()> {
    let s = &rig.scale;
    let mode = if s.is_dual_mode() { "dual" } else { "single" };
    let tuning = s.tuning();
    let class = s.detected_load_cell_class().map(|c| c.as_str());
    let factors = channel_factors(s);
    let value = json!({
        "connected": s.is_connected(),
        "mode": mode,
        "data_lines": s.data_lines(),
        "clock_line": s.clock_line(),
        "health": s.health_status().as_str(),
        "state": s.filter_state_name(),
        "weight_g": s.get_last_filtered_weight(),
        "calibration_factor": s.calibration_factor(),
        "channel_factors": factors,
        "tuning": tuning_json(&tuning),
        "detected_class": class,
    });
    let text = format!(
        "connected:          {}\n\
         mode:               {mode} (data lines {:?}, clock line {})\n\
         health:             {}\n\
         filter state:       {}\n\
         calibration factor: {} {:?}\n\
         brewing threshold:  {} g\n\
         stability timeout:  {} ms\n\
         median samples:     {}\n\
         average samples:    {}",
        s.is_connected(),
        s.data_lines(),
        s.clock_line(),
        s.health_status(),
        s.filter_state_name(),
        s.calibration_factor(),
        factors,
        tuning.brewing_threshold,
        tuning.stability_timeout_ms,
        tuning.median_samples,
        tuning.average_samples,
    );
    emit(json_mode, &value, &text);
    Ok(())
}

pub fn run_tare(rig: &mut Rig, times: Option<u8>, json_mode: bool) -> eyre::Result<()> {
    match times {
        Some(n) => rig.scale.tare_times(n),
        None => rig.scale.tare(),
    }
    .map_err(eyre::Report::new)?;
    emit(
        json_mode,
        &json!({ "tared": true, "state": rig.scale.filter_state_name() }),
        "tare complete",
    );
    Ok(())
}

pub fn run_calibrate(
    rig: &mut Rig,
    factor: Option<f32>,
    factors: Option<&[f32]>,
    json_mode: bool,
) -> eyre::Result<()> {
    match (factor, factors) {
        (Some(f), _) => rig.scale.set_calibration_factor(f),
        (None, Some([first, second])) => {
            if !rig.scale.is_dual_mode() {
                eyre::bail!("--factors needs two load cells; use --factor in single mode");
            }
            rig.scale.set_calibration_factors(*first, *second)
        }
        _ => eyre::bail!("pass --factor or --factors"),
    }
    .map_err(eyre::Report::new)?;

    let combined = rig.scale.calibration_factor();
    let factors = channel_factors(&rig.scale);
    emit(
        json_mode,
        &json!({ "calibration_factor": combined, "channel_factors": factors }),
        &format!("calibration factor set: {combined} {factors:?}"),
    );
    Ok(())
}

pub fn run_tune(
    rig: &mut Rig,
    brewing_threshold: Option<f32>,
    stability_timeout_ms: Option<u32>,
    median_samples: Option<usize>,
    average_samples: Option<usize>,
    json_mode: bool,
) -> eyre::Result<()> {
    // Validate everything first so a rejected value leaves the store untouched.
    let mut candidate = rig.scale.tuning();
    if let Some(v) = brewing_threshold {
        candidate.set_brewing_threshold(v)?;
    }
    if let Some(v) = stability_timeout_ms {
        candidate.set_stability_timeout_ms(v)?;
    }
    if let Some(v) = median_samples {
        candidate.set_median_samples(v)?;
    }
    if let Some(v) = average_samples {
        candidate.set_average_samples(v)?;
    }

    if let Some(v) = brewing_threshold {
        rig.scale.set_brewing_threshold(v);
    }
    if let Some(v) = stability_timeout_ms {
        rig.scale.set_stability_timeout_ms(v);
    }
    if let Some(v) = median_samples {
        rig.scale.set_median_samples(v);
    }
    if let Some(v) = average_samples {
        rig.scale.set_average_samples(v);
    }

    let t = rig.scale.tuning();
    emit(
        json_mode,
        &tuning_json(&t),
        &format!(
            "brewing threshold {} g, stability timeout {} ms, median {} / average {} samples",
            t.brewing_threshold, t.stability_timeout_ms, t.median_samples, t.average_samples
        ),
    );
    Ok(())
}

/// Take one reading after initialization and report health.
pub fn run_self_check(rig: &mut Rig, json_mode: bool) -> eyre::Result<()> {
    std::thread::sleep(Duration::from_millis(rig.scale.timing().sample_interval_ms));
    let weight = rig.scale.get_filtered_weight();
    let health = rig.scale.health_status();
    if !health.is_ok() {
        eyre::bail!("self-check failed: health {health}");
    }
    emit(
        json_mode,
        &json!({ "ok": true, "health": health.as_str(), "weight_g": weight }),
        &format!("OK: {health}, {weight:.2} g"),
    );
    Ok(())
}
