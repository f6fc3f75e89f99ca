//! Cumulative emission accounting.
//!
//! Emission accrues in whole days under a piecewise-constant daily rate. The
//! interval `[start, at]` is cut at every reduction inside it and each segment
//! contributes `floor(len / ONE_DAY) * rate`. Nothing is pro-rated within a day
//! and nothing is clamped to the cap here.

use crate::types::{whole_days, Reduction, Timestamp, TokenAmount};

/// Daily rate in effect at `at`: the latest reduction whose effective time is
/// not after `at`, or `initial_rate` if there is none.
pub fn rate_at(initial_rate: TokenAmount, reductions: &[Reduction], at: Timestamp) -> TokenAmount {
    reductions
        .iter()
        .take_while(|r| r.effective_timestamp <= at)
        .last()
        .map_or(initial_rate, |r| r.daily_rate)
}

/// Total tokens emittable from `start` through `at`.
///
/// `reductions` must be ordered by effective time. Reductions at or before
/// `start` only decide the starting rate.
pub fn cumulative_emission(
    start: Timestamp,
    initial_rate: TokenAmount,
    reductions: &[Reduction],
    at: Timestamp,
) -> TokenAmount {
    if at < start {
        return 0;
    }

    let mut total: TokenAmount = 0;
    let mut segment_start = start;
    let mut rate = rate_at(initial_rate, reductions, start);

    for reduction in reductions
        .iter()
        .skip_while(|r| r.effective_timestamp <= start)
    {
        if reduction.effective_timestamp > at {
            break;
        }
        total = total.saturating_add(segment_emission(
            segment_start,
            reduction.effective_timestamp,
            rate,
        ));
        segment_start = reduction.effective_timestamp;
        rate = reduction.daily_rate;
    }

    total.saturating_add(segment_emission(segment_start, at, rate))
}

/// Emission between two instants, both measured with `cumulative_emission`.
pub fn emission_between(
    start: Timestamp,
    initial_rate: TokenAmount,
    reductions: &[Reduction],
    from: Timestamp,
    to: Timestamp,
) -> TokenAmount {
    if to <= from {
        return 0;
    }
    cumulative_emission(start, initial_rate, reductions, to)
        .saturating_sub(cumulative_emission(start, initial_rate, reductions, from))
}

fn segment_emission(from: Timestamp, to: Timestamp, rate: TokenAmount) -> TokenAmount {
    let days = whole_days(to.saturating_sub(from)) as TokenAmount;
    days.saturating_mul(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ONE_DAY, REDUCTION_COOLDOWN};

    const START: Timestamp = 1_700_000_000;

    #[test]
    fn nothing_accrues_before_start() {
        assert_eq!(cumulative_emission(START, 100, &[], START - 1), 0);
        assert_eq!(cumulative_emission(START, 100, &[], 0), 0);
    }

    #[test]
    fn partial_day_contributes_nothing() {
        assert_eq!(cumulative_emission(START, 100, &[], START), 0);
        assert_eq!(cumulative_emission(START, 100, &[], START + ONE_DAY - 1), 0);
        assert_eq!(cumulative_emission(START, 100, &[], START + ONE_DAY), 100);
        assert_eq!(cumulative_emission(START, 100, &[], START + 2 * ONE_DAY + 10), 200);
    }

    #[test]
    fn rate_switches_at_reduction_boundary() {
        let reductions = [Reduction::new(START + REDUCTION_COOLDOWN, 60)];

        assert_eq!(
            cumulative_emission(START, 100, &reductions, START + REDUCTION_COOLDOWN),
            183 * 100
        );
        assert_eq!(
            cumulative_emission(START, 100, &reductions, START + 184 * ONE_DAY),
            183 * 100 + 60
        );
        assert_eq!(
            cumulative_emission(START, 100, &reductions, START + 200 * ONE_DAY),
            183 * 100 + 17 * 60
        );
    }

    #[test]
    fn unaligned_reduction_truncates_each_segment() {
        let effective = START + REDUCTION_COOLDOWN + ONE_DAY / 2;
        let reductions = [Reduction::new(effective, 50)];

        // 183.5 days at the initial rate count as 183.
        assert_eq!(cumulative_emission(START, 100, &reductions, effective), 18_300);
        assert_eq!(
            cumulative_emission(START, 100, &reductions, effective + ONE_DAY - 1),
            18_300
        );
        assert_eq!(
            cumulative_emission(START, 100, &reductions, effective + ONE_DAY),
            18_350
        );
    }

    #[test]
    fn reductions_before_start_set_starting_rate() {
        let reductions = [Reduction::new(START - ONE_DAY, 40)];
        assert_eq!(cumulative_emission(START, 100, &reductions, START + 3 * ONE_DAY), 120);
        assert_eq!(rate_at(100, &reductions, START), 40);
        assert_eq!(rate_at(100, &reductions, START - 2 * ONE_DAY), 100);
    }

    #[test]
    fn multiple_reductions_chain() {
        let first = START + REDUCTION_COOLDOWN;
        let second = first + REDUCTION_COOLDOWN;
        let reductions = [Reduction::new(first, 200), Reduction::new(second, 100)];

        let at = second + 10 * ONE_DAY;
        assert_eq!(
            cumulative_emission(START, 150, &reductions, at),
            183 * 150 + 183 * 200 + 10 * 100
        );
        assert_eq!(rate_at(150, &reductions, first - 1), 150);
        assert_eq!(rate_at(150, &reductions, first), 200);
        assert_eq!(rate_at(150, &reductions, at), 100);
    }

    #[test]
    fn emission_between_is_difference_of_cumulatives() {
        assert_eq!(emission_between(START, 10, &[], START, START + 5 * ONE_DAY), 50);
        assert_eq!(emission_between(START, 10, &[], START + 5 * ONE_DAY, START), 0);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let at = START + 10 * ONE_DAY;
        assert_eq!(cumulative_emission(START, u128::MAX, &[], at), u128::MAX);
    }
}
