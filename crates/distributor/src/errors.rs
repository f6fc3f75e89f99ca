use crate::address::Address;
use oft_emission::{ScheduleError, TokenAmount};
use thiserror::Error;

/// Errors raised by the minting authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributorError {
    #[error("{0} does not hold the distributor role")]
    Unauthorized(Address),

    #[error("admin capability does not belong to the distributor's schedule")]
    ForeignAdmin,

    #[error("distribution amount must be greater than zero")]
    ZeroAmount,

    #[error("max cap {cap} exceeded: distributed={distributed}, requested={requested}")]
    MaxCapExceeded {
        cap: TokenAmount,
        distributed: TokenAmount,
        requested: TokenAmount,
    },

    #[error("requested {requested} exceeds emitted allowance {available}")]
    ExceedsEmission {
        available: TokenAmount,
        requested: TokenAmount,
    },

    #[error("insufficient balance for {account}: balance={balance}, requested={requested}")]
    InsufficientBalance {
        account: Address,
        balance: TokenAmount,
        requested: TokenAmount,
    },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
