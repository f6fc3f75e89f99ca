use crate::types::{Timestamp, TokenAmount};
use thiserror::Error;

/// Reasons a proposed schedule mutation is rejected.
///
/// A rejection never alters the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("reduction at {requested} is too soon; earliest allowed is {earliest}")]
    TooSoon {
        requested: Timestamp,
        earliest: Timestamp,
    },

    #[error("daily rate {rate} is below the minimum {min}")]
    RateTooLow { rate: TokenAmount, min: TokenAmount },

    #[error("daily rate {rate} is above the maximum {max}")]
    RateTooHigh { rate: TokenAmount, max: TokenAmount },

    #[error("start time {requested} is before the current time {now}")]
    BeforeCurrentTime { requested: Timestamp, now: Timestamp },

    #[error("start time {requested} is after the deadline {deadline}")]
    AfterDeadline {
        requested: Timestamp,
        deadline: Timestamp,
    },

    #[error("distribution already started at {start} (now {now})")]
    DistributionAlreadyStarted { start: Timestamp, now: Timestamp },

    #[error("admin capability does not belong to this schedule")]
    Unauthorized,

    #[error("invalid schedule parameter: {0}")]
    InvalidParameter(&'static str),
}
