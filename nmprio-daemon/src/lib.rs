pub mod config;
pub mod file_lock;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::{error, info};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use nmprio::{Backoff, NmDirectory};

use crate::config::{DEFAULT_CONFIG_PATH, DaemonConfig};
use crate::file_lock::{acquire_daemon_lock, default_lock_path};

#[derive(Parser, Debug)]
#[command(name = "nmprio-daemon")]
#[command(about = "Keeps NetworkManager on the best visible Wi-Fi network")]
#[command(disable_version_flag = true)]
#[command(version)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,

    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.version {
        println!("nmprio-daemon {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_logging(args.verbose);

    let config = DaemonConfig::load(&args.config)
        .with_context(|| format!("cannot load {}", args.config.display()))?;
    let engine_config = config.engine_config();

    let lock_path = config.lock_file.clone().unwrap_or_else(default_lock_path);
    let _lock = acquire_daemon_lock(&lock_path).map_err(anyhow::Error::msg)?;

    // Connects on first use; an absent bus only yields empty cycles.
    let directory = NmDirectory::new().with_scan_trigger(config.scan_trigger());

    if args.once {
        let (report, _) =
            nmprio::run_cycle(&directory, &engine_config, Backoff::new(engine_config.backoff))
                .await;
        if let Some(outcome) = report.activation {
            info!("Cycle finished: {outcome}");
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(forward_signals(shutdown.clone()));

    info!(
        "nmprio-daemon {} polling every {:?}",
        env!("CARGO_PKG_VERSION"),
        engine_config.poll_interval
    );
    nmprio::run(&directory, &engine_config, shutdown).await;
    info!("Stopped");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn forward_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                error!("Cannot listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = term.recv() => info!("Received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C");
    }
    shutdown.cancel();
}
