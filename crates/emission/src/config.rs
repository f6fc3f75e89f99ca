//! Schedule configuration.
//!
//! A schedule is described by an optional TOML file layered under
//! `EMISSION_*` environment variables. Reductions listed in the file are
//! replayed through [`EmissionSchedule::add_reduction`], so a configuration
//! that breaks the cooldown or the rate band is refused.

use crate::errors::ScheduleError;
use crate::schedule::{EmissionSchedule, ScheduleAdmin};
use crate::types::{
    amount_string, ScheduleParams, Timestamp, TokenAmount, DEFAULT_START_DELAY,
    START_TIME_DEADLINE,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Prefix of environment overrides, e.g. `EMISSION_MAX_CAP`.
pub const ENV_PREFIX: &str = "EMISSION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load schedule configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration file {0} not found")]
    MissingFile(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReductionConfig {
    pub effective_timestamp: Timestamp,
    #[serde(deserialize_with = "amount_string::deserialize")]
    pub daily_rate: TokenAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub deployment_timestamp: Timestamp,
    #[serde(default)]
    pub distribution_start_timestamp: Option<Timestamp>,
    #[serde(default)]
    pub start_time_deadline: Option<Timestamp>,
    #[serde(deserialize_with = "amount_string::deserialize")]
    pub initial_daily_rate: TokenAmount,
    #[serde(deserialize_with = "amount_string::deserialize")]
    pub max_cap: TokenAmount,
    #[serde(default)]
    pub reductions: Vec<ReductionConfig>,
}

impl ScheduleConfig {
    /// Load from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::MissingFile(path.display().to_string()));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        let config: ScheduleConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Parse from TOML text, without environment overrides.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn params(&self) -> ScheduleParams {
        let deployment = self.deployment_timestamp;
        ScheduleParams {
            deployment_timestamp: deployment,
            distribution_start_timestamp: self
                .distribution_start_timestamp
                .unwrap_or_else(|| deployment.saturating_add(DEFAULT_START_DELAY)),
            start_time_deadline: self
                .start_time_deadline
                .unwrap_or_else(|| deployment.saturating_add(START_TIME_DEADLINE)),
            initial_daily_rate: self.initial_daily_rate,
            max_cap: self.max_cap,
        }
    }

    /// Create the schedule and replay the configured reductions.
    pub fn build(&self) -> Result<(EmissionSchedule, ScheduleAdmin), ConfigError> {
        let (mut schedule, admin) = EmissionSchedule::new(self.params())?;

        for reduction in &self.reductions {
            schedule.add_reduction(&admin, reduction.effective_timestamp, reduction.daily_rate)?;
        }

        info!(
            target: "emission",
            "Loaded schedule {} with {} reductions",
            schedule.id(),
            schedule.reductions().len()
        );
        Ok((schedule, admin))
    }
}
