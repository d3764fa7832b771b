//! Error types for spendcast

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Insufficient data: {months} month(s) of history, {required} required")]
    InsufficientData { months: usize, required: usize },

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

/// Failures surfaced by the forecast engine
///
/// Per-category prediction failures are not represented here: the engine drops
/// the category from the batch instead.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// No expense history at all
    #[error("Not enough data to forecast")]
    NotEnoughData,

    /// Model-backed tier selected but the prediction model never loaded
    #[error("Forecast model unavailable: {0}")]
    ModelUnavailable(String),

    /// The record store could not be read
    #[error("Failed to aggregate expense history")]
    AggregationFailed(#[source] Box<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;
