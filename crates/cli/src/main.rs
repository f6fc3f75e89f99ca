//! OFT Emission Command Line Interface
//!
//! Loads an emission schedule from configuration and answers questions about
//! it: cumulative emission, rate, curve, lifecycle status, and whether a
//! proposed reduction would be accepted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use oft_emission::config::ScheduleConfig;
use oft_emission::{Clock, EmissionSchedule, ScheduleError, SystemClock, Timestamp, TokenAmount};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_FILE: &str = "emission.toml";

#[derive(Parser)]
#[command(name = "emission-cli")]
#[command(about = "OFT emission schedule inspector", long_about = None)]
#[command(version)]
struct Cli {
    /// Schedule configuration file (TOML); EMISSION_* env vars override it.
    /// Defaults to ./emission.toml when present.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Cumulative emission at a timestamp
    Cumulative {
        /// Unix seconds (defaults to now)
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// Daily rate in effect at a timestamp
    Rate {
        /// Unix seconds (defaults to now)
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// Sample the cumulative emission curve
    Curve {
        /// First sample (defaults to the distribution start)
        #[arg(long)]
        from: Option<Timestamp>,
        /// Last sample, inclusive
        #[arg(long)]
        to: Timestamp,
        /// Seconds between samples
        #[arg(long, default_value_t = oft_emission::ONE_DAY)]
        step: Timestamp,
    },
    /// Check whether a reduction would be accepted, without applying it
    CheckReduction {
        /// Effective timestamp of the reduction
        #[arg(long)]
        at: Timestamp,
        /// New daily rate in the smallest token unit
        #[arg(long)]
        rate: TokenAmount,
    },
    /// Lifecycle state and reduction log
    Status {
        /// Unix seconds (defaults to now)
        #[arg(long)]
        now: Option<Timestamp>,
    },
}

#[derive(Serialize)]
struct ReductionCheck {
    accepted: bool,
    effective_timestamp: Timestamp,
    daily_rate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = ScheduleConfig::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("loading schedule from {}", path.display()),
        None => "loading schedule from environment".to_string(),
    })?;
    let (schedule, _admin) = config.build().context("building schedule")?;
    debug!("schedule {} loaded", schedule.id());

    let output = run(&schedule, cli.command, SystemClock.now())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// An explicit path is used as given; the default is only picked up if it exists.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

fn run(
    schedule: &EmissionSchedule,
    command: Commands,
    now: Timestamp,
) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Cumulative { at } => {
            let at = at.unwrap_or(now);
            json!({
                "timestamp": at,
                "cumulative_emission": schedule.cumulative_emission(at).to_string(),
                "max_cap": schedule.max_cap().to_string(),
            })
        }
        Commands::Rate { at } => {
            let at = at.unwrap_or(now);
            json!({
                "timestamp": at,
                "daily_rate": schedule.rate_at(at).to_string(),
            })
        }
        Commands::Curve { from, to, step } => {
            let from = from.unwrap_or_else(|| schedule.distribution_start_timestamp());
            let points = schedule.emission_curve(from, to, step)?;
            serde_json::to_value(points)?
        }
        Commands::CheckReduction { at, rate } => {
            let outcome = schedule.validate_reduction(at, rate);
            serde_json::to_value(reduction_check(at, rate, outcome))?
        }
        Commands::Status { now: at } => {
            let at = at.unwrap_or(now);
            json!({
                "now": at,
                "state": schedule.state(at),
                "whole_days_elapsed": schedule.whole_days_elapsed(at),
                "cumulative_emission": schedule.cumulative_emission(at).to_string(),
                "schedule": schedule.snapshot(),
            })
        }
    };
    Ok(value)
}

fn reduction_check(
    at: Timestamp,
    rate: TokenAmount,
    outcome: Result<(), ScheduleError>,
) -> ReductionCheck {
    ReductionCheck {
        accepted: outcome.is_ok(),
        effective_timestamp: at,
        daily_rate: rate.to_string(),
        reason: outcome.err().map(|err| err.to_string()),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
    }
}
