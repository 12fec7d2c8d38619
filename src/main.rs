//! Fleet checkup
//!
//! Runs an ordered list of remote diagnostic commands against every host of an
//! inventory and reports which hosts failed what.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ config ──▶ inventory ──▶ target set
//!                                               │
//!                                               ▼
//!                         ┌──────────────── orchestrator ────────────────┐
//!                         │                                              │
//!                         │   host task ─┐                               │
//!                         │   host task ─┼─▶ bounded mpsc ─▶ aggregator  │
//!                         │   host task ─┘                      │        │
//!                         │     │                               ▼        │
//!                         │     ▼                         report (CSV)   │
//!                         │  broker ─▶ ssh transport            │        │
//!                         │  checks registry                    ▼        │
//!                         │                               summary        │
//!                         └──────────────────────────────────────────────┘
//!                                               │
//!                                               ▼
//!                                notifier (DingTalk or log)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::Instrument;

use fleet_checkup::config::load_config;
use fleet_checkup::lifecycle::startup;
use fleet_checkup::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "fleet-checkup")]
#[command(about = "Concurrent health checkup for a fleet of hosts", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short = 'f', long = "config")]
    config: PathBuf,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logging is configured by the file, so config errors go to stderr.
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            return Err(e.into());
        }
    };

    if cli.validate {
        println!("{}: configuration is valid", cli.config.display());
        return Ok(());
    }

    logging::init(&config.observability)?;
    tracing::info!("fleet-checkup v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let run_id = uuid::Uuid::new_v4();
    let outcome = startup::run(config)
        .instrument(tracing::info_span!("checkup_run", run_id = %run_id))
        .await;

    match outcome {
        Ok(outcome) => {
            tracing::info!(
                run_id = %run_id,
                hosts = outcome.summary.total_hosts,
                connection_failures = outcome.summary.connection_failures,
                report = %outcome.location.display_target(),
                "Checkup complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "Checkup failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag_is_required() {
        assert!(Cli::try_parse_from(["fleet-checkup"]).is_err());
        assert!(Cli::try_parse_from(["fleet-checkup", "--validate"]).is_err());
    }

    #[test]
    fn test_config_flag_forms() {
        let cli = Cli::try_parse_from(["fleet-checkup", "-f", "fleet.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("fleet.toml"));
        assert!(!cli.validate);

        let cli = Cli::try_parse_from(["fleet-checkup", "--config", "fleet.toml", "--validate"]).unwrap();
        assert!(cli.validate);
    }
}
