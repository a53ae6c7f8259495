//! serialscope: live plot of CSV telemetry from a serial device.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use serialscope::{run_scope, PathOpener, ScaleMode, ScopeConfig};

#[derive(Parser, Debug)]
#[command(name = "serialscope", version, about = "Live oscilloscope for CSV telemetry")]
struct Cli {
    /// Device or file to read (`-` for stdin); prefills the address field.
    address: Option<String>,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Samples kept per column.
    #[arg(long)]
    capacity: Option<usize>,

    /// Records folded per render tick.
    #[arg(long)]
    batch_limit: Option<usize>,

    /// Wait after opening the device before reading, in milliseconds.
    /// Defaults to `settle_delay_ms` from the config file, else 2000.
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Initial Y scale: `auto` or a half-range such as `±10` or `5`.
    #[arg(long)]
    scale: Option<ScaleMode>,

    /// Connect to the address on startup.
    #[arg(long)]
    connect: bool,

    /// Write the effective configuration to this path and exit.
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("serialscope=info")),
        )
        .with(fmt::layer())
        .init();
}

/// Boards reset when the port opens and need this long before they talk.
const DEFAULT_SETTLE_MS: u64 = 2000;

fn build_config(cli: &Cli) -> serialscope::Result<ScopeConfig> {
    let (mut cfg, file_keys) = match &cli.config {
        Some(path) => ScopeConfig::load_with_keys(path)?,
        None => (ScopeConfig::default(), Vec::new()),
    };
    if let Some(capacity) = cli.capacity {
        cfg.capacity = capacity;
    }
    if let Some(limit) = cli.batch_limit {
        cfg.batch_limit = limit;
    }
    cfg.settle_delay_ms = match cli.settle_ms {
        Some(ms) => ms,
        None if file_keys.iter().any(|k| k == "settle_delay_ms") => cfg.settle_delay_ms,
        None => DEFAULT_SETTLE_MS,
    };
    if let Some(address) = &cli.address {
        cfg.default_address = address.clone();
    }
    if let Some(scale) = cli.scale {
        cfg.initial_scale = scale;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let cfg = match build_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &cli.dump_config {
        return match cfg.save_to_path(path) {
            Ok(()) => {
                info!(path = %path.display(), "configuration written");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "could not write configuration");
                ExitCode::FAILURE
            }
        };
    }

    let initial = cli.connect.then(|| cfg.default_address.clone());
    match run_scope(cfg, PathOpener, initial) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "window closed with an error");
            ExitCode::FAILURE
        }
    }
}
