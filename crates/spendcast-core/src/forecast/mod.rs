//! Expense forecasting
//!
//! - `aggregator` - Monthly buckets, trailing averages, training export
//! - `confidence` - Confidence scoring
//! - `model` - Prediction capability and the linear model artifact
//! - `engine` - Tier selection and next-month forecasts

mod aggregator;
mod confidence;
mod engine;
mod model;

pub use aggregator::{
    build_buckets, distinct_months, ExpenseAggregator, MonthlyTotals, MIN_MONTHS_FOR_MODEL,
    TRAILING_WINDOW_MONTHS,
};
pub use confidence::{
    confidence_from_deviation, heuristic_confidence, CONFIDENCE_FLOOR, NEUTRAL_CONFIDENCE,
};
pub use engine::{ForecastEngine, ForecastReadiness};
pub use model::{ExpensePredictor, LinearExpenseModel, ModelState, PredictionInput};
