//! OFT Distributor Module
//!
//! Minting authority over the emission schedule: role-gated distribution,
//! max-cap enforcement at the call site, burn accounting and recipient
//! balances.

pub mod address;
pub mod distributor;
pub mod errors;
pub mod ledger;

pub use address::{Address, AddressParseError};
pub use distributor::{DistributionSummary, MasterDistributor};
pub use errors::DistributorError;
pub use ledger::{InMemoryLedger, RecipientLedger};
