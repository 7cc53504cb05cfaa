use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::models::snapshot::PortfolioSnapshot;

/// Sort a history ascending and deduplicate by date (first occurrence wins).
fn sort_dedup(history: Vec<PortfolioSnapshot>) -> BTreeMap<NaiveDate, PortfolioSnapshot> {
    let mut by_date = BTreeMap::new();
    for snapshot in history {
        by_date.entry(snapshot.date).or_insert(snapshot);
    }
    by_date
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Forward-fill trailing missing calendar days.
///
/// The output is sorted ascending and deduplicated by date. When the latest
/// snapshot is dated today or later this is a no-op. Otherwise one synthetic
/// snapshot is appended per calendar day from `last + 1` through `today - 1`
/// inclusive, each carrying the last known snapshot's assets forward.
///
/// Today's snapshot is intentionally never synthesized here; it is supplied
/// by the live valuation path outside this crate.
#[must_use]
pub fn fill_missing_dates(
    history: Vec<PortfolioSnapshot>,
    today: NaiveDate,
) -> Vec<PortfolioSnapshot> {
    let by_date = sort_dedup(history);

    let Some((&last_date, _)) = by_date.last_key_value() else {
        return Vec::new();
    };

    let mut filled: Vec<PortfolioSnapshot> = by_date.into_values().collect();
    if last_date >= today {
        return filled;
    }

    let Some(template) = filled.last().cloned() else {
        return filled;
    };

    let mut date = next_day(last_date);
    while date < today {
        filled.push(PortfolioSnapshot::carried_forward(date, &template));
        date = next_day(date);
    }

    filled
}

/// Fill interior gaps between consecutive known snapshots by carrying the
/// earlier snapshot forward, then delegate to [`fill_missing_dates`] for the
/// trailing fill. Idempotent: a second application changes nothing.
#[must_use]
pub fn fill_all_missing_dates(
    history: Vec<PortfolioSnapshot>,
    today: NaiveDate,
) -> Vec<PortfolioSnapshot> {
    let by_date = sort_dedup(history);

    let mut dense: Vec<PortfolioSnapshot> = Vec::with_capacity(by_date.len());
    for snapshot in by_date.into_values() {
        if let Some(previous) = dense.last().cloned() {
            let mut date = next_day(previous.date);
            while date < snapshot.date {
                dense.push(PortfolioSnapshot::carried_forward(date, &previous));
                date = next_day(date);
            }
        }
        dense.push(snapshot);
    }

    fill_missing_dates(dense, today)
}

/// The span of calendar dates missing between the last known snapshot and
/// yesterday, as computed by [`missing_date_range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Every calendar date from `start` through `end`, ascending
    pub dates: Vec<NaiveDate>,
}

impl MissingDateRange {
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Compute the dates missing between the latest snapshot and yesterday.
///
/// Returns `None` when there is no gap (latest snapshot is dated yesterday
/// or later) or when the history is empty. Today is never included;
/// today's valuation is assumed supplied live, not backfilled.
#[must_use]
pub fn missing_date_range(
    history: &[PortfolioSnapshot],
    today: NaiveDate,
) -> Option<MissingDateRange> {
    let yesterday = today.checked_sub_days(Days::new(1))?;
    let last_date = history.iter().map(|s| s.date).max()?;

    if last_date >= yesterday {
        return None;
    }

    let start = next_day(last_date);
    let mut dates = Vec::new();
    let mut date = start;
    while date <= yesterday {
        dates.push(date);
        date = next_day(date);
    }

    Some(MissingDateRange {
        start,
        end: yesterday,
        dates,
    })
}
