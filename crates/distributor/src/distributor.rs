//! Master distributor
//!
//! The minting authority in front of the emission schedule. The schedule only
//! says how much *could* have been emitted; the distributor enforces that
//! mints never outrun that allowance and never cross the max cap.

use crate::address::Address;
use crate::errors::DistributorError;
use crate::ledger::{InMemoryLedger, RecipientLedger};
use oft_emission::{
    amount_string, ScheduleAdmin, ScheduleState, SharedSchedule, Timestamp, TokenAmount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Point-in-time view of the distributor's books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Unclamped cumulative emission from the schedule
    #[serde(with = "amount_string")]
    pub emitted: TokenAmount,
    /// Total minted to recipients
    #[serde(with = "amount_string")]
    pub distributed: TokenAmount,
    /// Total burned by holders
    #[serde(with = "amount_string")]
    pub burned: TokenAmount,
    /// Minted minus burned
    #[serde(with = "amount_string")]
    pub circulating: TokenAmount,
    #[serde(with = "amount_string")]
    pub max_cap: TokenAmount,
    #[serde(with = "amount_string")]
    pub remaining_cap: TokenAmount,
    /// What may still be minted right now
    #[serde(with = "amount_string")]
    pub available: TokenAmount,
    /// Share of the cap already minted, in percent
    pub cap_utilization: Decimal,
    pub state: ScheduleState,
}

pub struct MasterDistributor<L: RecipientLedger = InMemoryLedger> {
    schedule: SharedSchedule,
    ledger: L,
    distributors: BTreeSet<Address>,
    distributed: TokenAmount,
    burned: TokenAmount,
}

impl MasterDistributor<InMemoryLedger> {
    pub fn in_memory(schedule: SharedSchedule) -> Self {
        Self::new(schedule, InMemoryLedger::new())
    }
}

impl<L: RecipientLedger> MasterDistributor<L> {
    pub fn new(schedule: SharedSchedule, ledger: L) -> Self {
        Self {
            schedule,
            ledger,
            distributors: BTreeSet::new(),
            distributed: 0,
            burned: 0,
        }
    }

    pub fn schedule(&self) -> &SharedSchedule {
        &self.schedule
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn distributed(&self) -> TokenAmount {
        self.distributed
    }

    pub fn burned(&self) -> TokenAmount {
        self.burned
    }

    pub fn is_distributor(&self, account: &Address) -> bool {
        self.distributors.contains(account)
    }

    pub fn grant_distributor_role(
        &mut self,
        admin: &ScheduleAdmin,
        account: Address,
    ) -> Result<(), DistributorError> {
        self.check_admin(admin)?;
        if self.distributors.insert(account) {
            info!(target: "distributor", "Granted distributor role to {}", account);
        }
        Ok(())
    }

    pub fn revoke_distributor_role(
        &mut self,
        admin: &ScheduleAdmin,
        account: &Address,
    ) -> Result<(), DistributorError> {
        self.check_admin(admin)?;
        if self.distributors.remove(account) {
            info!(target: "distributor", "Revoked distributor role from {}", account);
        }
        Ok(())
    }

    /// Schedule a rate change through the distributor.
    pub fn add_reduction(
        &self,
        admin: &ScheduleAdmin,
        effective_timestamp: Timestamp,
        daily_rate: TokenAmount,
    ) -> Result<(), DistributorError> {
        self.schedule
            .add_reduction(admin, effective_timestamp, daily_rate)?;
        Ok(())
    }

    /// Cumulative emission as of now, not clamped to the cap.
    pub fn get_all_token_distribution(&self) -> TokenAmount {
        self.schedule.cumulative_emission_now()
    }

    /// Amount that may be minted right now.
    pub fn available_to_distribute(&self) -> TokenAmount {
        self.allowance(self.get_all_token_distribution(), self.schedule.max_cap())
    }

    fn allowance(&self, emitted: TokenAmount, max_cap: TokenAmount) -> TokenAmount {
        emitted.min(max_cap).saturating_sub(self.distributed)
    }

    /// Mint `amount` to `to`.
    pub fn distribute(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), DistributorError> {
        self.authorize(caller)?;
        if amount == 0 {
            return Err(DistributorError::ZeroAmount);
        }
        self.check_allowance(amount)?;

        self.ledger.credit(to, amount)?;
        self.distributed = self.distributed.saturating_add(amount);

        info!(
            target: "distributor",
            "Distributed {} to {} (total distributed {})", amount, to, self.distributed
        );
        Ok(())
    }

    /// Mint to several recipients. The batch total is checked up front, so
    /// either every entry is minted or none is.
    pub fn distribute_batch(
        &mut self,
        caller: &Address,
        payouts: &[(Address, TokenAmount)],
    ) -> Result<TokenAmount, DistributorError> {
        self.authorize(caller)?;
        if payouts.is_empty() || payouts.iter().any(|(_, amount)| *amount == 0) {
            return Err(DistributorError::ZeroAmount);
        }

        let total = payouts
            .iter()
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount));
        self.check_allowance(total)?;

        for (to, amount) in payouts {
            self.ledger.credit(to, *amount)?;
            debug!(target: "distributor", "Batch credit {} to {}", amount, to);
        }
        self.distributed = self.distributed.saturating_add(total);

        info!(
            target: "distributor",
            "Distributed {} across {} recipients (total distributed {})",
            total,
            payouts.len(),
            self.distributed
        );
        Ok(total)
    }

    /// Burn tokens held by `from`. Burning never restores mint allowance.
    pub fn burn(&mut self, from: &Address, amount: TokenAmount) -> Result<(), DistributorError> {
        if amount == 0 {
            return Err(DistributorError::ZeroAmount);
        }
        self.ledger.debit(from, amount)?;
        self.burned = self.burned.saturating_add(amount);

        info!(
            target: "distributor",
            "Burned {} from {} (total burned {})", amount, from, self.burned
        );
        Ok(())
    }

    /// Books as of a single clock reading.
    pub fn summary(&self) -> DistributionSummary {
        let now = self.schedule.now();
        let (emitted, max_cap, state) = self
            .schedule
            .read(|s| (s.cumulative_emission(now), s.max_cap(), s.state(now)));

        DistributionSummary {
            emitted,
            distributed: self.distributed,
            burned: self.burned,
            circulating: self.ledger.total_supply(),
            max_cap,
            remaining_cap: max_cap.saturating_sub(self.distributed),
            available: self.allowance(emitted, max_cap),
            cap_utilization: percent_of(self.distributed, max_cap),
            state,
        }
    }

    fn authorize(&self, caller: &Address) -> Result<(), DistributorError> {
        if self.distributors.contains(caller) {
            Ok(())
        } else {
            warn!(target: "distributor", "Rejected mint from unauthorized caller {}", caller);
            Err(DistributorError::Unauthorized(*caller))
        }
    }

    fn check_admin(&self, admin: &ScheduleAdmin) -> Result<(), DistributorError> {
        if admin.authorizes(&self.schedule.id()) {
            Ok(())
        } else {
            Err(DistributorError::ForeignAdmin)
        }
    }

    fn check_allowance(&self, requested: TokenAmount) -> Result<(), DistributorError> {
        let max_cap = self.schedule.max_cap();
        let after = self.distributed.saturating_add(requested);
        if after > max_cap {
            warn!(
                target: "distributor",
                "Mint of {} would cross max cap {} (distributed {})",
                requested, max_cap, self.distributed
            );
            return Err(DistributorError::MaxCapExceeded {
                cap: max_cap,
                distributed: self.distributed,
                requested,
            });
        }

        let emitted = self.get_all_token_distribution();
        if after > emitted {
            return Err(DistributorError::ExceedsEmission {
                available: emitted.saturating_sub(self.distributed),
                requested,
            });
        }
        Ok(())
    }
}

/// Percent scaled by 10^4, so the result carries four decimal places.
const PERCENT_SCALE: u128 = 1_000_000;

fn percent_of(part: TokenAmount, whole: TokenAmount) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    // Divide in u128: Decimal only holds 96-bit mantissas.
    let scaled = match part.checked_mul(PERCENT_SCALE) {
        Some(product) => product / whole,
        None => part / (whole / PERCENT_SCALE).max(1),
    };
    i128::try_from(scaled)
        .ok()
        .and_then(|value| Decimal::try_from_i128_with_scale(value, 4).ok())
        .unwrap_or(Decimal::MAX)
}
