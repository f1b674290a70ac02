mod alert;
mod config;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use chrono::NaiveDate;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use gitcc_bridge::bootstrap::SINCE_DATE_FORMAT;
use gitcc_bridge::Bridge;

use crate::config::BridgeConfig;

#[derive(Parser)]
#[command(name = "gitcc")]
#[command(about = "Keeps a git repository and a ClearCase snapshot view in sync")]
struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lift new ClearCase check-ins into git
    Togit,
    /// Check pending git commits in to ClearCase
    Tocc,
    /// Update the ClearCase view if it is out of date
    Update,
    /// Reconcile silent drift between git and ClearCase
    Align,
    /// Bootstrap a new bridge from a view snapshot taken at DATE
    Init {
        /// Snapshot date, e.g. 15-Jan-2024
        #[arg(value_name = "DATE")]
        since: String,
    },
    /// Import the view into a fresh git repository without touching the
    /// config spec
    Clone {
        /// Snapshot date, e.g. 15-Jan-2024
        #[arg(value_name = "DATE")]
        since: String,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    let cfg = match BridgeConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("gitcc: {err}");
            process::exit(2);
        }
    };

    init_logging(cfg.core.log_file.as_deref());
    log::info!("git repository at: {}", cfg.core.git_root.display());
    log::info!("ClearCase view at: {}", cfg.core.cc_root.display());

    if let Err(err) = run(&cli.command, &cfg) {
        log::error!("{err:#}");
        if let Some(email) = &cfg.email {
            alert::send_failure_alert(email, &format!("{err:#}"));
        }
        process::exit(2);
    }
}

fn run(command: &Command, cfg: &BridgeConfig) -> anyhow::Result<()> {
    let mut bridge = Bridge::new(cfg.options())?;
    match command {
        Command::Togit => {
            bridge.sync_to_git()?;
        }
        Command::Tocc => {
            bridge.checkin_to_clearcase()?;
        }
        Command::Align => {
            bridge.align()?;
        }
        Command::Update => {
            if bridge.view_needs_update()? {
                log::info!("updating ClearCase view");
                bridge.update_view()?;
            } else {
                log::info!("ClearCase view is up to date");
            }
        }
        Command::Init { since } => {
            bridge.init_bridge(parse_since(since)?)?;
        }
        Command::Clone { since } => {
            bridge.clone_snapshot(parse_since(since)?)?;
        }
    }
    Ok(())
}

fn parse_since(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, SINCE_DATE_FORMAT)
        .with_context(|| format!("invalid date '{raw}', expected e.g. 15-Jan-2024"))
}

fn init_logging(log_file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(err) => eprintln!("gitcc: cannot open log file {}: {err}", path.display()),
        }
    }
    builder.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_since_accepts_cleartool_dates() {
        let date = parse_since("15-Jan-2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_since_rejects_iso_dates() {
        assert!(parse_since("2024-01-15").is_err());
    }
}
