//! Shared schedule handle for concurrent hosts.
//!
//! Queries take the read lock; mutations take the write lock, so appends to
//! the reduction log are serialized and readers never observe a partial one.

use crate::clock::{Clock, SystemClock};
use crate::errors::ScheduleError;
use crate::schedule::{EmissionSchedule, ScheduleAdmin, ScheduleSnapshot};
use crate::types::{ScheduleId, ScheduleState, Timestamp, TokenAmount};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone)]
pub struct SharedSchedule {
    inner: Arc<RwLock<EmissionSchedule>>,
    clock: Arc<dyn Clock>,
}

impl SharedSchedule {
    pub fn new(schedule: EmissionSchedule, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(schedule)),
            clock,
        }
    }

    /// Wrap a schedule evaluated against wall-clock time.
    pub fn with_system_clock(schedule: EmissionSchedule) -> Self {
        Self::new(schedule, Arc::new(SystemClock))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn id(&self) -> ScheduleId {
        self.inner.read().id()
    }

    pub fn max_cap(&self) -> TokenAmount {
        self.inner.read().max_cap()
    }

    pub fn cumulative_emission(&self, at: Timestamp) -> TokenAmount {
        self.inner.read().cumulative_emission(at)
    }

    pub fn cumulative_emission_now(&self) -> TokenAmount {
        self.cumulative_emission(self.clock.now())
    }

    pub fn rate_now(&self) -> TokenAmount {
        self.inner.read().rate_at(self.clock.now())
    }

    pub fn state(&self) -> ScheduleState {
        self.inner.read().state(self.clock.now())
    }

    pub fn validate_reduction(
        &self,
        effective_timestamp: Timestamp,
        daily_rate: TokenAmount,
    ) -> Result<(), ScheduleError> {
        self.inner
            .read()
            .validate_reduction(effective_timestamp, daily_rate)
    }

    pub fn add_reduction(
        &self,
        admin: &ScheduleAdmin,
        effective_timestamp: Timestamp,
        daily_rate: TokenAmount,
    ) -> Result<(), ScheduleError> {
        self.inner
            .write()
            .add_reduction(admin, effective_timestamp, daily_rate)
    }

    /// Move the distribution start, judged against the handle's clock.
    pub fn set_distribution_start_time(
        &self,
        admin: &ScheduleAdmin,
        new_start: Timestamp,
    ) -> Result<(), ScheduleError> {
        let now = self.clock.now();
        self.inner
            .write()
            .set_distribution_start_time(admin, new_start, now)
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.inner.read().snapshot()
    }

    /// Run `f` against the schedule under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&EmissionSchedule) -> R) -> R {
        f(&self.inner.read())
    }
}

impl std::fmt::Debug for SharedSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSchedule")
            .field("schedule", &*self.inner.read())
            .field("now", &self.clock.now())
            .finish()
    }
}
