//! Rebalancing period keys.

use chrono::{Datelike, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Half {
    /// January to June.
    First,
    /// July to December.
    Second,
}

impl Half {
    pub fn of(date: NaiveDate) -> Half {
        if date.month() <= 6 {
            Half::First
        } else {
            Half::Second
        }
    }
}

/// A rebalancing period: a calendar year, or one half of it.
///
/// Ordering is chronological, so a `BTreeMap<PeriodKey, _>` iterates periods
/// in the order they are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodKey {
    pub year: i32,
    pub half: Option<Half>,
}

impl PeriodKey {
    pub fn year(year: i32) -> Self {
        Self { year, half: None }
    }

    pub fn half(year: i32, half: Half) -> Self {
        Self {
            year,
            half: Some(half),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.half {
            None => write!(f, "{}", self.year),
            Some(Half::First) => write!(f, "{}-H1", self.year),
            Some(Half::Second) => write!(f, "{}-H2", self.year),
        }
    }
}

/// Tracking periods for a run of formation years, in chronological order.
pub fn tracking_periods(
    formation_years: impl Iterator<Item = i32>,
    semi_annual: bool,
) -> Vec<PeriodKey> {
    let mut periods = Vec::new();
    for year in formation_years {
        if semi_annual {
            periods.push(PeriodKey::half(year + 1, Half::First));
            periods.push(PeriodKey::half(year + 1, Half::Second));
        } else {
            periods.push(PeriodKey::year(year + 1));
        }
    }
    periods.sort();
    periods
}
