mod cli;
mod commands;
mod error_fmt;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;
    let cfg = brewscale_config::load_file(&cli.config)?;
    // Dropping the guard flushes the file sink, so it lives until the command ends.
    let _file_guard = init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), dual = cfg.is_dual(), "config loaded");

    let mut rig = commands::open_scale(&cfg)?;
    match cli.cmd {
        Commands::Watch { count, interval_ms } => {
            commands::run_watch(&mut rig, count, interval_ms, cli.json)
        }
        Commands::Status => commands::run_status(&rig, cli.json),
        Commands::Tare { times } => commands::run_tare(&mut rig, times, cli.json),
        Commands::Calibrate { factor, factors } => {
            commands::run_calibrate(&mut rig, factor, factors.as_deref(), cli.json)
        }
        Commands::Tune {
            brewing_threshold,
            stability_timeout_ms,
            median_samples,
            average_samples,
        } => commands::run_tune(
            &mut rig,
            brewing_threshold,
            stability_timeout_ms,
            median_samples,
            average_samples,
            cli.json,
        ),
        Commands::SelfCheck => commands::run_self_check(&mut rig, cli.json),
    }
}

/// Console logs go to stderr (JSON with `--json`); `[logging] file` adds a
/// JSON-lines file sink with its own level and rotation.
fn init_tracing(
    json: bool,
    level: &str,
    logging: &brewscale_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid --log-level {level}"))?;
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let mut guard = None;
    let file = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            let file_level = logging.level.as_deref().unwrap_or("info");
            let file_filter = EnvFilter::try_new(file_level)
                .wrap_err_with(|| format!("invalid logging.level {file_level}"))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}
