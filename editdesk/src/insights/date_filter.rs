use crate::api::models::dashboard::DateFilterKind;
use crate::planning::week_start_for;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};

/// A window of project creation dates. Days are UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    All,
    Today,
    /// Monday to Sunday
    Week,
    Month,
    Custom { from: NaiveDate, to: Option<NaiveDate> },
}

impl DateFilter {
    /// A `custom` filter without a start date covers everything.
    pub fn from_parts(kind: Option<DateFilterKind>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        match kind.unwrap_or_default() {
            DateFilterKind::All => DateFilter::All,
            DateFilterKind::Today => DateFilter::Today,
            DateFilterKind::Week => DateFilter::Week,
            DateFilterKind::Month => DateFilter::Month,
            DateFilterKind::Custom => match from {
                Some(from) => DateFilter::Custom { from, to },
                None => DateFilter::All,
            },
        }
    }

    /// Half-open `[start, end)` range relative to `now`, or `None` for no restriction.
    pub fn range(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let (first, last) = match *self {
            DateFilter::All => return None,
            DateFilter::Today => (today, today),
            DateFilter::Week => {
                let monday = week_start_for(today, 1);
                (monday, monday + Days::new(6))
            }
            DateFilter::Month => {
                let first = today.with_day(1)?;
                let last = first.checked_add_months(Months::new(1))? - Days::new(1);
                (first, last)
            }
            DateFilter::Custom { from, to } => (from, to.unwrap_or(from)),
        };
        Some((start_of(first), start_of(last + Days::new(1))))
    }
}

pub(crate) fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
