//! Calendar month arithmetic
//!
//! Month rollover is plain integer math on a zero-based month index
//! (`year * 12 + month - 1`), so nothing here depends on locale or timezone.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::models::Season;

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Build from a year and a 1-based month. Returns None if month is outside 1-12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing a date (time of day, if any, is irrelevant)
    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn season(&self) -> Season {
        match self.month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    /// The following calendar month (December rolls into January of next year)
    pub fn next(&self) -> Self {
        self.offset(1)
    }

    /// The preceding calendar month (January borrows from the previous year)
    pub fn previous(&self) -> Self {
        self.offset(-1)
    }

    /// Shift by a signed number of months
    pub fn offset(&self, months: i64) -> Self {
        Self::from_index(self.index() + months)
    }

    /// The `count` months immediately before this one, most recent first.
    /// This month itself is never included.
    pub fn preceding(&self, count: usize) -> Vec<YearMonth> {
        (1..=count as i64).map(|n| self.offset(-n)).collect()
    }

    fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
