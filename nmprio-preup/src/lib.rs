pub mod config;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::info;
use std::path::PathBuf;

use nmprio::NmDirectory;

use crate::config::{DEFAULT_CONFIG_PATH, PreupConfig};

#[derive(Parser, Debug)]
#[command(name = "nmprio-preup")]
#[command(about = "Applies DNS and IPv6 token rules to saved NetworkManager profiles")]
#[command(disable_version_flag = true)]
#[command(version)]
struct Args {
    /// Path to the YAML policy file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.version {
        println!("nmprio-preup {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let default = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();

    let policy = PreupConfig::load(&args.config)
        .and_then(|c| c.policy())
        .with_context(|| format!("invalid policy file {}", args.config.display()))?;

    let summary = NmDirectory::new()
        .patch_profiles(&policy)
        .await
        .context("cannot list saved profiles")?;

    info!(
        "Profiles patched: {} updated, {} ignored, {} failed",
        summary.updated, summary.ignored, summary.failed
    );
    Ok(())
}
