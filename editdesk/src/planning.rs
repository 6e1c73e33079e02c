//! Weekly shorts planning.
//!
//! Everything here is pure: expanding a plan's active weekdays into dated drafts for a
//! 7-day window, and the compliance and payout arithmetic applied when a week is closed.
//! Weekdays are numbered `0..=6` with `0` = Sunday, the convention stored in
//! `shorts_plans.active_days`.

use crate::api::models::shorts::PlanPaymentMode;
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeSet;
use thiserror::Error;

/// Day of week, `0` = Sunday through `6` = Saturday.
pub type Weekday = u8;

/// Upper bound on `shorts_per_day`, mirrored by the `shorts_plans_per_day_range` CHECK.
pub const MAX_SHORTS_PER_DAY: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("shorts_per_day must be at least 1")]
    ShortsPerDayTooLow,

    #[error("shorts_per_day must be at most {MAX_SHORTS_PER_DAY}")]
    ShortsPerDayTooHigh,

    #[error("active_days must contain at least one weekday")]
    NoActiveDays,

    #[error("weekday {0} is out of range, expected 0 (Sunday) to 6 (Saturday)")]
    WeekdayOutOfRange(i16),

    #[error("{0} cannot be negative")]
    NegativeRate(&'static str),
}

/// A non-empty, deduplicated set of weekdays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDays(BTreeSet<Weekday>);

impl ActiveDays {
    pub fn new(days: &[i16]) -> Result<Self, PlanningError> {
        let mut set = BTreeSet::new();
        for &day in days {
            let weekday = Weekday::try_from(day)
                .ok()
                .filter(|d| *d <= 6)
                .ok_or(PlanningError::WeekdayOutOfRange(day))?;
            set.insert(weekday);
        }
        if set.is_empty() {
            return Err(PlanningError::NoActiveDays);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0.contains(&weekday)
    }

    /// Sorted values in the storage representation.
    pub fn to_vec(&self) -> Vec<i16> {
        self.0.iter().map(|d| i16::from(*d)).collect()
    }
}

pub fn weekday_of(date: NaiveDate) -> Weekday {
    // num_days_from_sunday is always in 0..=6
    date.weekday().num_days_from_sunday() as Weekday
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortDraft {
    pub title: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekPlan {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub drafts: Vec<ShortDraft>,
}

impl WeekPlan {
    pub fn total_required(&self) -> usize {
        self.drafts.len()
    }
}

/// Expand a plan over the 7 days starting at `week_start`.
///
/// Every active day gets `Short #1 ..= Short #shorts_per_day`. The window is taken as given and
/// is never realigned to a particular weekday.
pub fn plan_week(week_start: NaiveDate, active_days: &ActiveDays, shorts_per_day: u32) -> WeekPlan {
    let week_end = week_start + Days::new(6);
    let drafts = week_start
        .iter_days()
        .take(7)
        .filter(|date| active_days.contains(weekday_of(*date)))
        .flat_map(|date| {
            (1..=shorts_per_day).map(move |n| ShortDraft {
                title: format!("Short #{n}"),
                due_date: date,
            })
        })
        .collect();

    WeekPlan {
        week_start,
        week_end,
        drafts,
    }
}

/// The latest date on or before `date` that falls on `week_starts_on`.
pub fn week_start_for(date: NaiveDate, week_starts_on: Weekday) -> NaiveDate {
    let back = (7 + u64::from(weekday_of(date)) - u64::from(week_starts_on % 7)) % 7;
    date - Days::new(back)
}

/// `completed / required * 100` rounded half away from zero to 2 decimals, capped at 100.
/// Zero when nothing was required.
pub fn compliance_percentage(completed: i64, required: i64) -> Decimal {
    if required <= 0 {
        return Decimal::ZERO;
    }
    let ratio = Decimal::from(completed.max(0)) * Decimal::ONE_HUNDRED / Decimal::from(required);
    ratio
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .min(Decimal::ONE_HUNDRED)
}

/// What the editor earns for a closed week.
pub fn editor_payment(weekly_rate: Decimal, mode: PlanPaymentMode, compliance: Decimal) -> Decimal {
    match mode {
        PlanPaymentMode::Fixed => weekly_rate,
        PlanPaymentMode::Proportional => (weekly_rate * compliance / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    }
}

/// What the client is charged for a closed week. Clients pay the full rate regardless of output.
pub fn client_charge(weekly_rate: Decimal) -> Decimal {
    weekly_rate
}

#[derive(Debug, Clone, Copy)]
pub struct PlanRates {
    pub client: Decimal,
    pub editor: Decimal,
}

/// Check the numbers of a plan, returning its parsed active days.
pub fn validate_plan(shorts_per_day: i32, active_days: &[i16], rates: PlanRates) -> Result<ActiveDays, PlanningError> {
    if shorts_per_day < 1 {
        return Err(PlanningError::ShortsPerDayTooLow);
    }
    if shorts_per_day > MAX_SHORTS_PER_DAY {
        return Err(PlanningError::ShortsPerDayTooHigh);
    }
    let days = ActiveDays::new(active_days)?;
    if rates.client < Decimal::ZERO {
        return Err(PlanningError::NegativeRate("weekly_rate_client"));
    }
    if rates.editor < Decimal::ZERO {
        return Err(PlanningError::NegativeRate("weekly_rate_editor"));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monday() -> NaiveDate {
        date(2025, 6, 2)
    }

    #[test]
    fn test_weekday_numbering_starts_on_sunday() {
        assert_eq!(weekday_of(date(2025, 6, 1)), 0);
        assert_eq!(weekday_of(monday()), 1);
        assert_eq!(weekday_of(date(2025, 6, 7)), 6);
    }

    #[test]
    fn test_active_days_dedupes_and_sorts() {
        let days = ActiveDays::new(&[5, 1, 3, 1]).unwrap();
        assert_eq!(days.to_vec(), vec![1, 3, 5]);
    }

    #[test]
    fn test_active_days_rejects_bad_input() {
        assert_eq!(ActiveDays::new(&[]), Err(PlanningError::NoActiveDays));
        assert_eq!(ActiveDays::new(&[1, 7]), Err(PlanningError::WeekdayOutOfRange(7)));
        assert_eq!(ActiveDays::new(&[-1]), Err(PlanningError::WeekdayOutOfRange(-1)));
    }

    #[test]
    fn test_plan_week_expands_active_days() {
        let days = ActiveDays::new(&[1, 3, 5]).unwrap();
        let plan = plan_week(monday(), &days, 2);

        assert_eq!(plan.week_end, date(2025, 6, 8));
        assert_eq!(plan.total_required(), 6);

        let first_two: Vec<_> = plan.drafts.iter().take(2).map(|d| (d.title.as_str(), d.due_date)).collect();
        assert_eq!(first_two, vec![("Short #1", monday()), ("Short #2", monday())]);

        let due_dates: BTreeSet<_> = plan.drafts.iter().map(|d| d.due_date).collect();
        assert_eq!(
            due_dates.into_iter().collect::<Vec<_>>(),
            vec![monday(), date(2025, 6, 4), date(2025, 6, 6)]
        );
    }

    #[test]
    fn test_plan_week_window_is_not_realigned() {
        // Starting on a Wednesday, Monday and Tuesday of the following week are in range
        let wednesday = date(2025, 6, 4);
        let days = ActiveDays::new(&[1, 2]).unwrap();
        let plan = plan_week(wednesday, &days, 1);

        assert_eq!(plan.week_start, wednesday);
        assert_eq!(plan.week_end, date(2025, 6, 10));
        let due: Vec<_> = plan.drafts.iter().map(|d| d.due_date).collect();
        assert_eq!(due, vec![date(2025, 6, 9), date(2025, 6, 10)]);
    }

    #[test]
    fn test_plan_week_every_day() {
        let days = ActiveDays::new(&[0, 1, 2, 3, 4, 5, 6]).unwrap();
        let plan = plan_week(monday(), &days, 3);
        assert_eq!(plan.total_required(), 21);
        // Titles are unique per day, which is what the (plan, due_date, title) key relies on
        let keys: BTreeSet<_> = plan.drafts.iter().map(|d| (d.due_date, d.title.clone())).collect();
        assert_eq!(keys.len(), 21);
    }

    #[test]
    fn test_week_start_for() {
        // Monday-based weeks
        assert_eq!(week_start_for(monday(), 1), monday());
        assert_eq!(week_start_for(date(2025, 6, 8), 1), monday());
        assert_eq!(week_start_for(date(2025, 6, 9), 1), date(2025, 6, 9));
        // Sunday-based weeks
        assert_eq!(week_start_for(date(2025, 6, 4), 0), date(2025, 6, 1));
        assert_eq!(week_start_for(date(2025, 6, 1), 0), date(2025, 6, 1));
    }

    #[test]
    fn test_compliance_percentage() {
        assert_eq!(compliance_percentage(0, 0), Decimal::ZERO);
        assert_eq!(compliance_percentage(5, 10), Decimal::new(50, 0));
        assert_eq!(compliance_percentage(1, 3), Decimal::new(3333, 2));
        assert_eq!(compliance_percentage(2, 3), Decimal::new(6667, 2));
        assert_eq!(compliance_percentage(12, 10), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_editor_payment_modes() {
        let rate = Decimal::new(15000, 2);
        let compliance = compliance_percentage(2, 3);

        assert_eq!(editor_payment(rate, PlanPaymentMode::Fixed, compliance), rate);
        assert_eq!(
            editor_payment(rate, PlanPaymentMode::Proportional, compliance),
            Decimal::new(10001, 2)
        );
        assert_eq!(
            editor_payment(rate, PlanPaymentMode::Proportional, Decimal::ZERO),
            Decimal::ZERO
        );
        assert_eq!(client_charge(Decimal::new(300, 0)), Decimal::new(300, 0));
    }

    #[test]
    fn test_validate_plan() {
        let ok = PlanRates {
            client: Decimal::new(100, 0),
            editor: Decimal::ZERO,
        };
        assert!(validate_plan(1, &[1], ok).is_ok());
        assert_eq!(validate_plan(0, &[1], ok).unwrap_err(), PlanningError::ShortsPerDayTooLow);
        assert!(validate_plan(MAX_SHORTS_PER_DAY, &[0, 1, 2, 3, 4, 5, 6], ok).is_ok());
        assert_eq!(
            validate_plan(MAX_SHORTS_PER_DAY + 1, &[1], ok).unwrap_err(),
            PlanningError::ShortsPerDayTooHigh
        );
        assert_eq!(validate_plan(i32::MAX, &[1], ok).unwrap_err(), PlanningError::ShortsPerDayTooHigh);
        assert_eq!(validate_plan(2, &[], ok).unwrap_err(), PlanningError::NoActiveDays);

        let negative = PlanRates {
            client: Decimal::new(100, 0),
            editor: Decimal::new(-1, 0),
        };
        assert_eq!(
            validate_plan(1, &[1], negative).unwrap_err(),
            PlanningError::NegativeRate("weekly_rate_editor")
        );
    }
}
