//! OFT Emission: daily emission schedule with reduction steps
//!
//! Off-chain model of the master distributor's emission policy:
//! - whole-day accrual from the distribution start at a piecewise-constant rate
//! - rate reductions spaced at least 183 days apart, each within 0.5x..=2x
//! - distribution start adjustable until it passes, up to a fixed deadline
//! - cap enforcement left to the minting authority
//!
//! Amounts are in the token's smallest unit; timestamps in Unix seconds.

pub mod clock;
pub mod config;
pub mod emission;
pub mod errors;
pub mod schedule;
pub mod shared;
pub mod types;

pub use clock::*;
pub use emission::{cumulative_emission, emission_between, rate_at};
pub use errors::*;
pub use schedule::*;
pub use shared::*;
pub use types::*;

/// Module version for API introspection
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
