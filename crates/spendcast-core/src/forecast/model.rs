//! Prediction capability used by the model-backed forecast tier

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Season;

/// Feature row handed to a predictor
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionInput {
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub trailing_three_month_average: f64,
    pub season: Season,
}

/// Something that can estimate a category's total for a month
///
/// Implementations may fail per call; the forecast engine drops the category
/// when they do.
pub trait ExpensePredictor: Send + Sync {
    fn predict(&self, input: &PredictionInput) -> Result<f64>;

    fn name(&self) -> &str;
}

/// Whether the engine has a predictor, resolved once at construction
pub enum ModelState {
    Loaded(Box<dyn ExpensePredictor>),
    Unavailable(String),
}

impl ModelState {
    pub fn from_result(result: Result<Box<dyn ExpensePredictor>>) -> Self {
        match result {
            Ok(predictor) => Self::Loaded(predictor),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(p) => f.debug_tuple("Loaded").field(&p.name()).finish(),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

fn default_model_name() -> String {
    "linear".to_string()
}

/// Linear regression over the forecast features, loaded from a JSON artifact
///
/// ```json
/// {
///   "intercept": 12.0,
///   "trailing_average_weight": 0.9,
///   "month_weight": 0.0,
///   "season_offsets": { "winter": 25.0 },
///   "category_offsets": { "Groceries": 4.5 },
///   "known_categories_only": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearExpenseModel {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub intercept: f64,
    pub trailing_average_weight: f64,
    #[serde(default)]
    pub month_weight: f64,
    /// Keyed by lowercase season name
    #[serde(default)]
    pub season_offsets: HashMap<String, f64>,
    #[serde(default)]
    pub category_offsets: HashMap<String, f64>,
    /// Refuse categories the model was not trained on
    #[serde(default)]
    pub known_categories_only: bool,
}

impl LinearExpenseModel {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model = Self::from_json(&content)?;
        debug!(path = %path.display(), model = %model.name, "Loaded forecast model");
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let coefficients = [self.intercept, self.trailing_average_weight, self.month_weight]
            .into_iter()
            .chain(self.season_offsets.values().copied())
            .chain(self.category_offsets.values().copied());

        for value in coefficients {
            if !value.is_finite() {
                return Err(Error::InvalidData(format!(
                    "Model '{}' has a non-finite coefficient",
                    self.name
                )));
            }
        }

        if let Some(key) = self
            .season_offsets
            .keys()
            .find(|k| k.parse::<Season>().is_err())
        {
            return Err(Error::InvalidData(format!(
                "Model '{}' has an unknown season '{}'",
                self.name, key
            )));
        }

        Ok(())
    }
}

impl ExpensePredictor for LinearExpenseModel {
    fn predict(&self, input: &PredictionInput) -> Result<f64> {
        let category_offset = match self.category_offsets.get(&input.category) {
            Some(offset) => *offset,
            None if self.known_categories_only => {
                return Err(Error::Prediction(format!(
                    "Unknown category '{}'",
                    input.category
                )))
            }
            None => 0.0,
        };

        let season_offset = self
            .season_offsets
            .get(input.season.as_str())
            .copied()
            .unwrap_or(0.0);

        let value = self.intercept
            + self.trailing_average_weight * input.trailing_three_month_average
            + self.month_weight * f64::from(input.month)
            + season_offset
            + category_offset;

        if !value.is_finite() {
            return Err(Error::Prediction(format!(
                "Non-finite prediction for '{}'",
                input.category
            )));
        }

        Ok(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
