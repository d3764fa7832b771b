//! Spendcast Core Library
//!
//! Expense forecasting over a personal transaction history:
//! - Record store contract, SQLite store and CSV import
//! - Monthly aggregation with trailing averages and season codes
//! - Tiered next-month forecasts with confidence scores
//! - Transaction categorization over pluggable local classifiers (Ollama, mock)

pub mod ai;
pub mod calendar;
pub mod categorize;
pub mod config;
pub mod db;
pub mod error;
pub mod forecast;
pub mod import;
pub mod models;
pub mod store;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{Classification, ClassifierClient, MockClassifier, OllamaClassifier, TextClassifier};
pub use calendar::YearMonth;
pub use categorize::{compose_input, CategorizationGateway, CategoryPrediction};
pub use config::{ClassifierBackend, Config};
pub use db::Database;
pub use error::{Error, ForecastError, Result};
pub use forecast::{
    confidence_from_deviation, ExpenseAggregator, ExpensePredictor, ForecastEngine,
    ForecastReadiness, LinearExpenseModel, PredictionInput,
};
pub use models::{
    CategoryForecast, MonthlyExpenseBucket, NewTransaction, Season, TransactionRecord,
    TransactionType,
};
pub use store::{InMemoryStore, TransactionStore};
