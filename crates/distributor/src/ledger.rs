//! Recipient ledger interface for minted tokens
//!
//! Provides a lightweight, deterministic interface for crediting, debiting,
//! and tracking recipient balances as the distributor mints and burns.

use crate::address::Address;
use crate::errors::DistributorError;
use oft_emission::TokenAmount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interface for ledger operations.
pub trait RecipientLedger: Send + Sync {
    /// Credit an account with newly minted tokens.
    fn credit(&mut self, account: &Address, amount: TokenAmount) -> Result<(), DistributorError>;

    /// Debit an account (burn).
    fn debit(&mut self, account: &Address, amount: TokenAmount) -> Result<(), DistributorError>;

    /// Retrieve an account's balance.
    fn balance_of(&self, account: &Address) -> TokenAmount;

    /// Circulating supply across all accounts.
    fn total_supply(&self) -> TokenAmount;

    /// Snapshot of every non-zero balance.
    fn balances(&self) -> HashMap<Address, TokenAmount>;
}

// -----------------------------------------------------------------------------
// In-memory implementation
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    balances: HashMap<Address, TokenAmount>,
    total_supply: TokenAmount,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecipientLedger for InMemoryLedger {
    fn credit(&mut self, account: &Address, amount: TokenAmount) -> Result<(), DistributorError> {
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
        self.total_supply = self.total_supply.saturating_add(amount);
        Ok(())
    }

    fn debit(&mut self, account: &Address, amount: TokenAmount) -> Result<(), DistributorError> {
        let balance = self.balance_of(account);
        if balance < amount {
            return Err(DistributorError::InsufficientBalance {
                account: *account,
                balance,
                requested: amount,
            });
        }

        let remaining = balance - amount;
        if remaining == 0 {
            self.balances.remove(account);
        } else {
            self.balances.insert(*account, remaining);
        }
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    fn balance_of(&self, account: &Address) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> TokenAmount {
        self.total_supply
    }

    fn balances(&self) -> HashMap<Address, TokenAmount> {
        self.balances.clone()
    }
}
