use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

/// Inclusive span of posting timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.date(), self.end.date())
    }
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        DateRange { start, end }
    }

    /// Smallest range covering every timestamp, or `None` for an empty input.
    pub fn spanning<I>(dates: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        dates.into_iter().fold(None, |acc, d| match acc {
            None => Some(DateRange::new(d, d)),
            Some(r) => Some(DateRange::new(r.start.min(d), r.end.max(d))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: Money,
    pub max: Money,
}

impl fmt::Display for AmountRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.min, self.max)
    }
}

impl AmountRange {
    pub fn spanning<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().fold(None, |acc, a| match acc {
            None => Some(AmountRange { min: a, max: a }),
            Some(r) => Some(AmountRange {
                min: r.min.min(a),
                max: r.max.max(a),
            }),
        })
    }
}
