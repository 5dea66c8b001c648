use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::WeekRange;

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Groups dates into Sunday-aligned weeks, ascending. Each week ends on its
/// latest observed date rather than the following Saturday.
pub fn partition_weeks<I>(dates: I) -> Vec<WeekRange>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut weeks: BTreeMap<NaiveDate, NaiveDate> = BTreeMap::new();

    for date in dates {
        let end = weeks.entry(week_start(date)).or_insert(date);
        if date > *end {
            *end = date;
        }
    }

    weeks
        .into_iter()
        .map(|(start, end)| WeekRange { start, end })
        .collect()
}

/// The range selected when nothing has been chosen yet.
pub fn default_week(weeks: &[WeekRange]) -> Option<WeekRange> {
    weeks.last().copied()
}
