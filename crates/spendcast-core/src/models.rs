//! Domain models for spendcast

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether money left or entered the user's pocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "debit" => Ok(Self::Expense),
            "income" | "credit" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction as read from the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    /// Always non-negative; direction is carried by `kind`
    pub amount: f64,
    pub kind: TransactionType,
    /// Time of day is ignored for monthly bucketing
    pub date: NaiveDateTime,
    pub category_name: String,
    pub description: String,
}

/// A transaction to be inserted into the store
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionType,
    pub category_name: String,
    /// Deduplication key (SHA-256 over the identifying fields)
    pub import_hash: String,
}

impl NewTransaction {
    /// Reject values the store must never hold
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Transaction amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if self.category_name.trim().is_empty() {
            return Err(Error::InvalidData(
                "Transaction category must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Season code derived from the calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Map a calendar month (1-12) to its season
    ///
    /// December, January and February are Winter. Returns None outside 1-12.
    pub fn for_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Self::Winter),
            3..=5 => Some(Self::Spring),
            6..=8 => Some(Self::Summer),
            9..=11 => Some(Self::Fall),
            _ => None,
        }
    }

    /// Numeric feature code used by the prediction model and training table
    pub fn code(&self) -> u8 {
        match self {
            Self::Winter => 1,
            Self::Spring => 2,
            Self::Summer => 3,
            Self::Fall => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }

    pub fn all() -> [Season; 4] {
        [Self::Winter, Self::Spring, Self::Summer, Self::Fall]
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "winter" => Ok(Self::Winter),
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "fall" | "autumn" => Ok(Self::Fall),
            _ => Err(format!("Unknown season: {}", s)),
        }
    }
}

/// Expense total for one (year, month, category) key
///
/// Derived on every aggregation request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyExpenseBucket {
    pub year: i32,
    pub month: u32,
    pub category_name: String,
    pub total_amount: f64,
    /// Mean over the preceding three calendar months that have data
    pub trailing_three_month_average: f64,
    pub season: Season,
}

/// Next-month prediction for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryForecast {
    pub category_name: String,
    pub predicted_amount: f64,
    /// In [0, 1]
    pub confidence: f64,
    pub historical_average: f64,
    /// True when produced by the short-history fallback rather than the model
    pub is_heuristic: bool,
}
