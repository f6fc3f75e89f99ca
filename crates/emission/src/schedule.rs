//! Emission schedule with admin-gated mutations.
//!
//! The schedule owns the append-only reduction log. Mutations require the
//! [`ScheduleAdmin`] capability handed out when the schedule is created, and
//! every rejected mutation leaves the schedule untouched.

use crate::emission;
use crate::errors::ScheduleError;
use crate::types::{
    amount_string, whole_days, EmissionCurvePoint, Reduction, ScheduleId, ScheduleParams, ScheduleState,
    Timestamp, TokenAmount, REDUCTION_COOLDOWN,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static SCHEDULE_NONCE: AtomicU64 = AtomicU64::new(0);

/// Upper bound on the points a single curve query may produce.
pub const MAX_CURVE_POINTS: u64 = 100_000;

/// Capability authorizing mutations of exactly one schedule.
///
/// Not `Clone`: authority moves with ownership of the value.
#[derive(Debug)]
pub struct ScheduleAdmin {
    schedule_id: ScheduleId,
}

impl ScheduleAdmin {
    pub fn schedule_id(&self) -> ScheduleId {
        self.schedule_id
    }

    /// Whether this capability was issued for `schedule_id`.
    pub fn authorizes(&self, schedule_id: &ScheduleId) -> bool {
        self.schedule_id == *schedule_id
    }
}

/// Daily emission schedule with periodic rate reductions.
#[derive(Debug, Clone)]
pub struct EmissionSchedule {
    id: ScheduleId,
    params: ScheduleParams,
    reductions: Vec<Reduction>,
}

/// Serializable view of a schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSnapshot {
    pub id: String,
    pub params: ScheduleParams,
    pub reductions: Vec<Reduction>,
    #[serde(with = "amount_string")]
    pub current_daily_rate: TokenAmount,
    pub next_reduction_earliest: Timestamp,
}

impl EmissionSchedule {
    /// Create a schedule and the capability that may mutate it.
    pub fn new(params: ScheduleParams) -> Result<(Self, ScheduleAdmin), ScheduleError> {
        validate_params(&params)?;

        let id = derive_schedule_id(&params);
        info!(
            target: "emission",
            "Created emission schedule {}: start={}, daily_rate={}, max_cap={}",
            id,
            params.distribution_start_timestamp,
            params.initial_daily_rate,
            params.max_cap
        );

        let schedule = Self {
            id,
            params,
            reductions: Vec::new(),
        };
        Ok((schedule, ScheduleAdmin { schedule_id: id }))
    }

    pub fn id(&self) -> ScheduleId {
        self.id
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    pub fn distribution_start_timestamp(&self) -> Timestamp {
        self.params.distribution_start_timestamp
    }

    pub fn initial_daily_rate(&self) -> TokenAmount {
        self.params.initial_daily_rate
    }

    pub fn max_cap(&self) -> TokenAmount {
        self.params.max_cap
    }

    pub fn reductions(&self) -> &[Reduction] {
        &self.reductions
    }

    /// Rate the next reduction is measured against.
    pub fn latest_daily_rate(&self) -> TokenAmount {
        self.reductions
            .last()
            .map_or(self.params.initial_daily_rate, |r| r.daily_rate)
    }

    /// Earliest instant a new reduction may take effect.
    pub fn next_reduction_earliest(&self) -> Timestamp {
        let anchor = self
            .reductions
            .last()
            .map_or(self.params.distribution_start_timestamp, |r| {
                r.effective_timestamp
            });
        anchor.saturating_add(REDUCTION_COOLDOWN)
    }

    /// Total tokens emittable from the distribution start through `at`.
    ///
    /// Unclamped: the result may exceed `max_cap`.
    pub fn cumulative_emission(&self, at: Timestamp) -> TokenAmount {
        let total = emission::cumulative_emission(
            self.params.distribution_start_timestamp,
            self.params.initial_daily_rate,
            &self.reductions,
            at,
        );
        debug!(target: "emission", "cumulative emission at {}: {}", at, total);
        total
    }

    /// Daily rate in effect at `at`.
    pub fn rate_at(&self, at: Timestamp) -> TokenAmount {
        emission::rate_at(self.params.initial_daily_rate, &self.reductions, at)
    }

    /// Whole days elapsed since the distribution start.
    pub fn whole_days_elapsed(&self, now: Timestamp) -> u64 {
        whole_days(now.saturating_sub(self.params.distribution_start_timestamp))
    }

    pub fn state(&self, now: Timestamp) -> ScheduleState {
        if now < self.params.distribution_start_timestamp {
            ScheduleState::Unstarted
        } else if self.cumulative_emission(now) >= self.params.max_cap {
            ScheduleState::CapReached
        } else {
            ScheduleState::Active
        }
    }

    /// Check a proposed reduction without applying it.
    ///
    /// The cooldown is checked before the rate band, so an early submission is
    /// always `TooSoon`.
    pub fn validate_reduction(
        &self,
        effective_timestamp: Timestamp,
        daily_rate: TokenAmount,
    ) -> Result<(), ScheduleError> {
        let earliest = self.next_reduction_earliest();
        if effective_timestamp < earliest {
            return Err(ScheduleError::TooSoon {
                requested: effective_timestamp,
                earliest,
            });
        }

        let previous = self.latest_daily_rate();
        let min = previous / 2;
        if daily_rate < min {
            return Err(ScheduleError::RateTooLow {
                rate: daily_rate,
                min,
            });
        }

        let max = previous.saturating_mul(2);
        if daily_rate > max {
            return Err(ScheduleError::RateTooHigh {
                rate: daily_rate,
                max,
            });
        }

        Ok(())
    }

    /// Append a reduction to the log.
    pub fn add_reduction(
        &mut self,
        admin: &ScheduleAdmin,
        effective_timestamp: Timestamp,
        daily_rate: TokenAmount,
    ) -> Result<(), ScheduleError> {
        self.authorize(admin)?;

        if let Err(err) = self.validate_reduction(effective_timestamp, daily_rate) {
            warn!(
                target: "emission",
                "Rejected reduction ({}, {}) for schedule {}: {}",
                effective_timestamp, daily_rate, self.id, err
            );
            return Err(err);
        }

        self.reductions
            .push(Reduction::new(effective_timestamp, daily_rate));
        info!(
            target: "emission",
            "Schedule {}: daily rate {} from {} ({} reductions)",
            self.id,
            daily_rate,
            effective_timestamp,
            self.reductions.len()
        );
        Ok(())
    }

    /// Move the distribution start while it is still pending.
    pub fn set_distribution_start_time(
        &mut self,
        admin: &ScheduleAdmin,
        new_start: Timestamp,
        now: Timestamp,
    ) -> Result<(), ScheduleError> {
        self.authorize(admin)?;

        let current = self.params.distribution_start_timestamp;
        let outcome = if now >= current {
            Err(ScheduleError::DistributionAlreadyStarted {
                start: current,
                now,
            })
        } else if new_start < now {
            Err(ScheduleError::BeforeCurrentTime {
                requested: new_start,
                now,
            })
        } else if new_start > self.params.start_time_deadline {
            Err(ScheduleError::AfterDeadline {
                requested: new_start,
                deadline: self.params.start_time_deadline,
            })
        } else {
            Ok(())
        };

        if let Err(err) = outcome {
            warn!(
                target: "emission",
                "Rejected start time {} for schedule {}: {}", new_start, self.id, err
            );
            return Err(err);
        }

        self.params.distribution_start_timestamp = new_start;
        info!(
            target: "emission",
            "Schedule {}: distribution start moved {} -> {}", self.id, current, new_start
        );
        Ok(())
    }

    /// Sample the cumulative curve on `[from, to]` every `step` seconds.
    pub fn emission_curve(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: Timestamp,
    ) -> Result<Vec<EmissionCurvePoint>, ScheduleError> {
        if step == 0 {
            return Err(ScheduleError::InvalidParameter("curve step must be positive"));
        }
        if to.saturating_sub(from) / step >= MAX_CURVE_POINTS {
            return Err(ScheduleError::InvalidParameter("curve has too many points"));
        }

        let points = (from..=to)
            .step_by(step as usize)
            .map(|timestamp| {
                let cumulative_emission = self.cumulative_emission(timestamp);
                EmissionCurvePoint {
                    timestamp,
                    daily_rate: self.rate_at(timestamp),
                    cumulative_emission,
                    cap_reached: cumulative_emission >= self.params.max_cap,
                }
            })
            .collect();
        Ok(points)
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            id: self.id.to_hex(),
            params: self.params.clone(),
            reductions: self.reductions.clone(),
            current_daily_rate: self.latest_daily_rate(),
            next_reduction_earliest: self.next_reduction_earliest(),
        }
    }

    fn authorize(&self, admin: &ScheduleAdmin) -> Result<(), ScheduleError> {
        if admin.authorizes(&self.id) {
            Ok(())
        } else {
            warn!(
                target: "emission",
                "Admin for {} attempted to mutate schedule {}", admin.schedule_id, self.id
            );
            Err(ScheduleError::Unauthorized)
        }
    }
}

fn validate_params(params: &ScheduleParams) -> Result<(), ScheduleError> {
    if params.initial_daily_rate == 0 {
        return Err(ScheduleError::InvalidParameter(
            "initial_daily_rate must be greater than 0",
        ));
    }
    if params.max_cap == 0 {
        return Err(ScheduleError::InvalidParameter("max_cap must be greater than 0"));
    }
    if params.distribution_start_timestamp < params.deployment_timestamp {
        return Err(ScheduleError::InvalidParameter(
            "distribution start precedes deployment",
        ));
    }
    if params.distribution_start_timestamp > params.start_time_deadline {
        return Err(ScheduleError::InvalidParameter(
            "distribution start is after the start time deadline",
        ));
    }
    Ok(())
}

fn derive_schedule_id(params: &ScheduleParams) -> ScheduleId {
    let nonce = SCHEDULE_NONCE.fetch_add(1, Ordering::Relaxed);
    let mut hasher = blake3::Hasher::new();
    hasher.update(&params.deployment_timestamp.to_le_bytes());
    hasher.update(&params.distribution_start_timestamp.to_le_bytes());
    hasher.update(&params.start_time_deadline.to_le_bytes());
    hasher.update(&params.initial_daily_rate.to_le_bytes());
    hasher.update(&params.max_cap.to_le_bytes());
    hasher.update(&nonce.to_le_bytes());
    ScheduleId(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ONE_DAY, START_TIME_DEADLINE};

    const DEPLOYED: Timestamp = 1_700_000_000;

    fn schedule(rate: TokenAmount) -> (EmissionSchedule, ScheduleAdmin) {
        EmissionSchedule::new(ScheduleParams::at_deployment(DEPLOYED, rate, u128::MAX)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_params() {
        let mut params = ScheduleParams::at_deployment(DEPLOYED, 0, 1_000);
        assert!(matches!(
            EmissionSchedule::new(params.clone()),
            Err(ScheduleError::InvalidParameter(_))
        ));

        params.initial_daily_rate = 10;
        params.distribution_start_timestamp = DEPLOYED - 1;
        assert!(EmissionSchedule::new(params.clone()).is_err());

        params.distribution_start_timestamp = params.start_time_deadline + 1;
        assert!(EmissionSchedule::new(params).is_err());
    }

    #[test]
    fn test_reduction_cooldown_from_start() {
        let (mut schedule, admin) = schedule(1_000);
        let start = schedule.distribution_start_timestamp();

        let err = schedule
            .add_reduction(&admin, start + REDUCTION_COOLDOWN - 1, 1_000)
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::TooSoon {
                requested: start + REDUCTION_COOLDOWN - 1,
                earliest: start + REDUCTION_COOLDOWN,
            }
        );
        assert!(schedule.reductions().is_empty());

        schedule
            .add_reduction(&admin, start + REDUCTION_COOLDOWN, 800)
            .unwrap();
        assert_eq!(schedule.reductions().len(), 1);
        assert_eq!(
            schedule.next_reduction_earliest(),
            start + 2 * REDUCTION_COOLDOWN
        );
    }

    #[test]
    fn test_too_soon_wins_over_rate_errors() {
        let (schedule, _admin) = schedule(1_000);
        let start = schedule.distribution_start_timestamp();
        let err = schedule.validate_reduction(start, 1).unwrap_err();
        assert!(matches!(err, ScheduleError::TooSoon { .. }));
        let err = schedule.validate_reduction(start, 1_000_000).unwrap_err();
        assert!(matches!(err, ScheduleError::TooSoon { .. }));
    }

    #[test]
    fn test_rate_band_edges() {
        let (schedule, _admin) = schedule(1_000);
        let at = schedule.next_reduction_earliest();

        assert!(schedule.validate_reduction(at, 500).is_ok());
        assert!(schedule.validate_reduction(at, 2_000).is_ok());
        assert_eq!(
            schedule.validate_reduction(at, 499),
            Err(ScheduleError::RateTooLow { rate: 499, min: 500 })
        );
        assert_eq!(
            schedule.validate_reduction(at, 2_001),
            Err(ScheduleError::RateTooHigh {
                rate: 2_001,
                max: 2_000
            })
        );
    }

    #[test]
    fn test_out_of_band_reduction_is_not_appended() {
        let (mut schedule, admin) = schedule(1_000);
        let at = schedule.next_reduction_earliest();
        let later = at + 30 * ONE_DAY;
        let before = schedule.cumulative_emission(later);

        assert_eq!(
            schedule.add_reduction(&admin, at, 499),
            Err(ScheduleError::RateTooLow { rate: 499, min: 500 })
        );
        assert_eq!(
            schedule.add_reduction(&admin, at, 2_001),
            Err(ScheduleError::RateTooHigh {
                rate: 2_001,
                max: 2_000
            })
        );

        assert!(schedule.reductions().is_empty());
        assert_eq!(schedule.latest_daily_rate(), 1_000);
        assert_eq!(schedule.next_reduction_earliest(), at);
        assert_eq!(schedule.cumulative_emission(later), before);
    }

    #[test]
    fn test_rate_band_follows_latest_reduction() {
        let (mut schedule, admin) = schedule(1_000);
        let first = schedule.next_reduction_earliest();
        schedule.add_reduction(&admin, first, 2_000).unwrap();

        let second = schedule.next_reduction_earliest();
        assert!(schedule.validate_reduction(second, 4_000).is_ok());
        assert!(schedule.validate_reduction(second, 1_000).is_ok());
        assert!(matches!(
            schedule.validate_reduction(second, 999),
            Err(ScheduleError::RateTooLow { .. })
        ));
    }

    #[test]
    fn test_foreign_admin_is_unauthorized() {
        let (mut schedule, _admin) = schedule(1_000);
        let (_other, other_admin) = self::schedule(1_000);
        let at = schedule.next_reduction_earliest();

        assert_eq!(
            schedule.add_reduction(&other_admin, at, 1_000),
            Err(ScheduleError::Unauthorized)
        );
        assert_eq!(
            schedule.set_distribution_start_time(&other_admin, DEPLOYED + ONE_DAY, DEPLOYED),
            Err(ScheduleError::Unauthorized)
        );
        assert!(schedule.reductions().is_empty());
    }

    #[test]
    fn test_set_distribution_start_time() {
        let (mut schedule, admin) = schedule(1_000);
        let now = DEPLOYED + ONE_DAY;

        schedule
            .set_distribution_start_time(&admin, DEPLOYED + 20 * ONE_DAY, now)
            .unwrap();
        assert_eq!(schedule.distribution_start_timestamp(), DEPLOYED + 20 * ONE_DAY);

        // Later calls overwrite the pending value.
        schedule
            .set_distribution_start_time(&admin, DEPLOYED + 2 * ONE_DAY, now)
            .unwrap();
        assert_eq!(schedule.distribution_start_timestamp(), DEPLOYED + 2 * ONE_DAY);

        assert_eq!(
            schedule.set_distribution_start_time(&admin, now - 1, now),
            Err(ScheduleError::BeforeCurrentTime {
                requested: now - 1,
                now
            })
        );
        assert_eq!(schedule.distribution_start_timestamp(), DEPLOYED + 2 * ONE_DAY);

        assert_eq!(
            schedule.set_distribution_start_time(&admin, DEPLOYED + START_TIME_DEADLINE + 1, now),
            Err(ScheduleError::AfterDeadline {
                requested: DEPLOYED + START_TIME_DEADLINE + 1,
                deadline: DEPLOYED + START_TIME_DEADLINE,
            })
        );
        assert_eq!(schedule.distribution_start_timestamp(), DEPLOYED + 2 * ONE_DAY);

        assert!(schedule
            .set_distribution_start_time(&admin, DEPLOYED + START_TIME_DEADLINE, now)
            .is_ok());
    }

    #[test]
    fn test_start_time_frozen_once_started() {
        let (mut schedule, admin) = schedule(1_000);
        let start = schedule.distribution_start_timestamp();

        assert_eq!(
            schedule.set_distribution_start_time(&admin, start + ONE_DAY, start),
            Err(ScheduleError::DistributionAlreadyStarted { start, now: start })
        );
        assert_eq!(schedule.distribution_start_timestamp(), start);
    }

    #[test]
    fn test_state_transitions() {
        let params = ScheduleParams::at_deployment(DEPLOYED, 100, 1_000);
        let (schedule, _admin) = EmissionSchedule::new(params).unwrap();
        let start = schedule.distribution_start_timestamp();

        assert_eq!(schedule.state(start - 1), ScheduleState::Unstarted);
        assert_eq!(schedule.state(start), ScheduleState::Active);
        assert_eq!(schedule.state(start + 9 * ONE_DAY), ScheduleState::Active);
        assert_eq!(schedule.state(start + 10 * ONE_DAY), ScheduleState::CapReached);
        // Keeps computing past the cap.
        assert_eq!(schedule.cumulative_emission(start + 20 * ONE_DAY), 2_000);
    }

    #[test]
    fn test_emission_curve() {
        let params = ScheduleParams::at_deployment(DEPLOYED, 100, 250);
        let (schedule, _admin) = EmissionSchedule::new(params).unwrap();
        let start = schedule.distribution_start_timestamp();

        let curve = schedule
            .emission_curve(start, start + 3 * ONE_DAY, ONE_DAY)
            .unwrap();
        let cumulative: Vec<_> = curve.iter().map(|p| p.cumulative_emission).collect();
        assert_eq!(cumulative, vec![0, 100, 200, 300]);
        assert!(!curve[2].cap_reached);
        assert!(curve[3].cap_reached);

        assert!(schedule.emission_curve(start, start, 0).is_err());
    }

    #[test]
    fn test_emission_curve_point_limit() {
        let (schedule, _admin) = schedule(1_000);
        let start = schedule.distribution_start_timestamp();

        let curve = schedule
            .emission_curve(start, start + (MAX_CURVE_POINTS - 1) * ONE_DAY, ONE_DAY)
            .unwrap();
        assert_eq!(curve.len() as u64, MAX_CURVE_POINTS);

        assert_eq!(
            schedule.emission_curve(start, start + MAX_CURVE_POINTS * ONE_DAY, ONE_DAY),
            Err(ScheduleError::InvalidParameter("curve has too many points"))
        );
        assert!(schedule.emission_curve(0, u64::MAX, 1).is_err());
    }

    #[test]
    fn test_schedule_ids_are_unique() {
        let (a, admin_a) = schedule(1_000);
        let (b, _) = schedule(1_000);
        assert_ne!(a.id(), b.id());
        assert!(admin_a.authorizes(&a.id()));
        assert!(!admin_a.authorizes(&b.id()));
    }

    #[test]
    fn test_snapshot_reports_next_window() {
        let (mut schedule, admin) = schedule(1_000);
        let at = schedule.next_reduction_earliest();
        schedule.add_reduction(&admin, at, 600).unwrap();

        let snapshot = schedule.snapshot();
        assert_eq!(snapshot.current_daily_rate, 600);
        assert_eq!(snapshot.next_reduction_earliest, at + REDUCTION_COOLDOWN);
        assert_eq!(snapshot.id, schedule.id().to_hex());
    }
}
