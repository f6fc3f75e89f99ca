//! Core types for the emission schedule
//!
//! Defines time and monetary units, schedule constants, reduction entries,
//! creation parameters and the projection records returned by queries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// Token amount in the smallest on-chain unit
pub type TokenAmount = u128;

/// One full emission day in seconds
pub const ONE_DAY: Timestamp = 86_400;

/// Minimum spacing between consecutive reductions (half a year)
pub const REDUCTION_COOLDOWN: Timestamp = 183 * ONE_DAY;

/// Gap between deployment and the default distribution start
pub const DEFAULT_START_DELAY: Timestamp = 14 * ONE_DAY;

/// Latest distribution start, measured from deployment
pub const START_TIME_DEADLINE: Timestamp = 30 * ONE_DAY;

/// A scheduled change of the daily emission rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reduction {
    /// Instant from which `daily_rate` applies
    pub effective_timestamp: Timestamp,
    /// Tokens emitted per whole day from `effective_timestamp` onward
    #[serde(with = "amount_string")]
    pub daily_rate: TokenAmount,
}

impl Reduction {
    pub fn new(effective_timestamp: Timestamp, daily_rate: TokenAmount) -> Self {
        Self {
            effective_timestamp,
            daily_rate,
        }
    }
}

/// Parameters fixed when the distributor is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParams {
    /// Deployment instant of the distributor
    pub deployment_timestamp: Timestamp,
    /// Instant before which nothing accrues
    pub distribution_start_timestamp: Timestamp,
    /// Latest instant the start may be moved to
    pub start_time_deadline: Timestamp,
    /// Tokens per whole day before any reduction
    #[serde(with = "amount_string")]
    pub initial_daily_rate: TokenAmount,
    /// Ceiling on cumulative emission, enforced by the minting authority
    #[serde(with = "amount_string")]
    pub max_cap: TokenAmount,
}

impl ScheduleParams {
    /// Parameters as the distributor sets them at deployment: start two weeks
    /// out, adjustable for thirty days.
    pub fn at_deployment(
        deployment_timestamp: Timestamp,
        initial_daily_rate: TokenAmount,
        max_cap: TokenAmount,
    ) -> Self {
        Self {
            deployment_timestamp,
            distribution_start_timestamp: deployment_timestamp.saturating_add(DEFAULT_START_DELAY),
            start_time_deadline: deployment_timestamp.saturating_add(START_TIME_DEADLINE),
            initial_daily_rate,
            max_cap,
        }
    }
}

/// Lifecycle of a schedule relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// Distribution has not started; cumulative emission is zero
    Unstarted,
    /// Emission accrues day by day
    Active,
    /// Cumulative emission has reached `max_cap`; the minting authority refuses further mints
    CapReached,
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScheduleState::Unstarted => "unstarted",
            ScheduleState::Active => "active",
            ScheduleState::CapReached => "cap_reached",
        };
        f.write_str(label)
    }
}

/// A sampled point of the cumulative emission curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionCurvePoint {
    pub timestamp: Timestamp,
    #[serde(with = "amount_string")]
    pub daily_rate: TokenAmount,
    #[serde(with = "amount_string")]
    pub cumulative_emission: TokenAmount,
    pub cap_reached: bool,
}

/// Identity binding a schedule to its admin capability.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub [u8; 32]);

impl ScheduleId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScheduleId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Serde adapter writing amounts as decimal strings.
///
/// 18-decimal amounts overflow JSON and TOML integers. Reading accepts either
/// an integer or a string, with `_` separators allowed in strings.
pub mod amount_string {
    use super::TokenAmount;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &TokenAmount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TokenAmount, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(value) => Ok(TokenAmount::from(value)),
            Repr::Text(text) => {
                let digits: String = text.trim().chars().filter(|c| *c != '_').collect();
                digits
                    .parse()
                    .map_err(|_| de::Error::custom(format!("invalid token amount: {text}")))
            }
        }
    }
}

/// Number of whole days contained in `seconds`.
pub fn whole_days(seconds: Timestamp) -> u64 {
    seconds / ONE_DAY
}
