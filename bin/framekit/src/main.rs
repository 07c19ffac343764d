//! framekit – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON when `FRAMEKIT_LOG_JSON` is set).
//! 3. Parse the command line and run one subcommand.

mod cli;
mod commands;
mod config;

use clap::Parser;
use framekit_transfer::TransferConfig;
use tracing::info;

use crate::cli::{Args, Command};
use crate::commands::DownloadArgs;
use crate::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let args = Args::parse();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: FRAMEKIT_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "framekit starting");

    // ── 3. Command ─────────────────────────────────────────────────────────────
    match args.cmd {
        Command::Download {
            dataset,
            split,
            output,
            limit,
            repo,
            metadata,
        } => {
            commands::download(
                &cfg,
                DownloadArgs {
                    dataset,
                    split,
                    output,
                    limit,
                    repo,
                    metadata,
                },
            )
            .await
        }
        Command::Transfer {
            action,
            input,
            output,
            bucket,
            prefix,
        } => commands::transfer(action, input, output, TransferConfig::new(bucket, prefix)).await,
        Command::Validate { root } => commands::validate(&root),
    }
}
