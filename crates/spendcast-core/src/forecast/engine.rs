//! Tiered next-month forecasting
//!
//! Tier is picked from the number of distinct months of expense history:
//! none fails with `NotEnoughData`, one or two use a per-category mean, three
//! or more ask the prediction model.

use std::cmp::Ordering;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::aggregator::{distinct_months, ExpenseAggregator, MonthlyTotals, MIN_MONTHS_FOR_MODEL};
use super::confidence::{confidence_from_deviation, heuristic_confidence};
use super::model::{ExpensePredictor, LinearExpenseModel, ModelState, PredictionInput};
use crate::calendar::YearMonth;
use crate::error::{Error, ForecastError, Result};
use crate::models::CategoryForecast;
use crate::store::TransactionStore;

type ForecastResult<T> = std::result::Result<T, ForecastError>;

/// How far along the history is toward model-backed forecasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ForecastReadiness {
    /// No expenses recorded yet
    NoData,
    /// Heuristic forecasts only
    Collecting { months: usize, required: usize },
    /// Enough history for the model tier
    Ready { months: usize },
}

impl ForecastReadiness {
    pub fn from_months(months: usize) -> Self {
        match months {
            0 => Self::NoData,
            m if m < MIN_MONTHS_FOR_MODEL => Self::Collecting {
                months: m,
                required: MIN_MONTHS_FOR_MODEL,
            },
            m => Self::Ready { months: m },
        }
    }
}

pub struct ForecastEngine<'a> {
    aggregator: ExpenseAggregator<'a>,
    model: ModelState,
    reference_date: NaiveDate,
}

impl<'a> ForecastEngine<'a> {
    /// Build an engine around a store and the outcome of loading a predictor
    ///
    /// A load failure is remembered for the lifetime of the engine; the model
    /// tier then reports `ModelUnavailable` instead of retrying.
    pub fn new(
        store: &'a dyn TransactionStore,
        model: Result<Box<dyn ExpensePredictor>>,
    ) -> Self {
        match &model {
            Ok(predictor) => debug!(model = predictor.name(), "Forecast model loaded"),
            Err(e) => warn!(error = %e, "Forecast model unavailable"),
        }

        Self {
            aggregator: ExpenseAggregator::new(store),
            model: ModelState::from_result(model),
            reference_date: chrono::Local::now().date_naive(),
        }
    }

    pub fn without_model(store: &'a dyn TransactionStore) -> Self {
        Self::new(
            store,
            Err(Error::NotFound("No forecast model configured".into())),
        )
    }

    /// Load a `LinearExpenseModel` artifact from disk
    pub fn with_model_path(store: &'a dyn TransactionStore, path: &Path) -> Self {
        let model = LinearExpenseModel::load(path)
            .map(|m| Box::new(m) as Box<dyn ExpensePredictor>);
        Self::new(store, model)
    }

    /// Pin "today". The forecast targets the month after this date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn target_month(&self) -> YearMonth {
        YearMonth::of(&self.reference_date).next()
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model
    }

    pub fn readiness(&self) -> ForecastResult<ForecastReadiness> {
        Ok(ForecastReadiness::from_months(
            self.aggregator.months_of_data_count()?,
        ))
    }

    /// Forecast every category for the target month, largest first
    pub fn forecast_next_month(&self) -> ForecastResult<Vec<CategoryForecast>> {
        let buckets = self.aggregator.aggregate_monthly_expenses()?;
        let months = distinct_months(&buckets);
        let totals = MonthlyTotals::from_buckets(&buckets);

        let mut forecasts = match months {
            0 => {
                debug!("No expense history, nothing to forecast");
                return Err(ForecastError::NotEnoughData);
            }
            m if m < MIN_MONTHS_FOR_MODEL => {
                debug!(months = m, "Using heuristic forecast tier");
                heuristic_forecasts(&totals, m)
            }
            m => {
                debug!(months = m, target = %self.target_month(), "Using model forecast tier");
                self.model_forecasts(&totals)?
            }
        };

        // Stable: equal amounts keep category order
        forecasts.sort_by(|a, b| {
            b.predicted_amount
                .partial_cmp(&a.predicted_amount)
                .unwrap_or(Ordering::Equal)
        });

        info!(
            categories = forecasts.len(),
            months,
            target = %self.target_month(),
            "Forecast complete"
        );
        Ok(forecasts)
    }

    /// Forecast a single category
    ///
    /// Runs the full batch and picks the category out so the numbers always
    /// match `forecast_next_month`.
    pub fn forecast_for_category(&self, category: &str) -> ForecastResult<CategoryForecast> {
        self.forecast_next_month()?
            .into_iter()
            .find(|f| f.category_name == category)
            .ok_or(ForecastError::NotEnoughData)
    }

    fn model_forecasts(&self, totals: &MonthlyTotals) -> ForecastResult<Vec<CategoryForecast>> {
        let predictor = match &self.model {
            ModelState::Loaded(predictor) => predictor,
            ModelState::Unavailable(reason) => {
                return Err(ForecastError::ModelUnavailable(reason.clone()))
            }
        };

        let target = self.target_month();
        let mut forecasts = Vec::new();

        for category in totals.categories() {
            let historical_average = totals.trailing_average(category, target);
            let input = PredictionInput {
                year: target.year(),
                month: target.month(),
                category: category.to_string(),
                trailing_three_month_average: historical_average,
                season: target.season(),
            };

            let raw = match predictor.predict(&input) {
                Ok(value) if value.is_finite() => value,
                Ok(value) => {
                    warn!(category, value, "Model returned a non-finite prediction, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(category, error = %e, "Prediction failed, skipping category");
                    continue;
                }
            };

            let predicted_amount = raw.max(0.0);
            let confidence = confidence_from_deviation(predicted_amount, historical_average);
            debug!(
                category,
                raw,
                predicted_amount,
                historical_average,
                confidence,
                "Model forecast"
            );

            forecasts.push(CategoryForecast {
                category_name: category.to_string(),
                predicted_amount,
                confidence,
                historical_average,
                is_heuristic: false,
            });
        }

        Ok(forecasts)
    }
}

fn heuristic_forecasts(totals: &MonthlyTotals, months: usize) -> Vec<CategoryForecast> {
    let confidence = heuristic_confidence(months);

    totals
        .categories()
        .filter_map(|category| {
            let values = totals.category_totals(category);
            if values.is_empty() {
                return None;
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Some(CategoryForecast {
                category_name: category.to_string(),
                predicted_amount: mean,
                confidence,
                historical_average: mean,
                is_heuristic: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Season, TransactionRecord, TransactionType};
    use crate::store::InMemoryStore;
    use std::sync::{Arc, Mutex};

    /// Predictor driven by a closure
    struct FnPredictor<F>(F);

    impl<F> ExpensePredictor for FnPredictor<F>
    where
        F: Fn(&PredictionInput) -> Result<f64> + Send + Sync,
    {
        fn predict(&self, input: &PredictionInput) -> Result<f64> {
            (self.0)(input)
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn predictor<F>(f: F) -> Result<Box<dyn ExpensePredictor>>
    where
        F: Fn(&PredictionInput) -> Result<f64> + Send + Sync + 'static,
    {
        Ok(Box::new(FnPredictor(f)))
    }

    struct FailingStore;

    impl TransactionStore for FailingStore {
        fn fetch_all(&self) -> Result<Vec<TransactionRecord>> {
            Err(Error::InvalidData("disk on fire".into()))
        }
    }

    fn record(id: i64, y: i32, m: u32, amount: f64, category: &str, kind: TransactionType) -> TransactionRecord {
        TransactionRecord {
            id,
            amount,
            kind,
            date: NaiveDate::from_ymd_opt(y, m, 12)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            category_name: category.to_string(),
            description: String::new(),
        }
    }

    fn expense(id: i64, y: i32, m: u32, amount: f64, category: &str) -> TransactionRecord {
        record(id, y, m, amount, category, TransactionType::Expense)
    }

    fn march_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn three_month_store() -> InMemoryStore {
        InMemoryStore::new(vec![
            expense(1, 2024, 1, 100.0, "Food"),
            expense(2, 2024, 2, 200.0, "Food"),
            expense(3, 2024, 3, 300.0, "Food"),
            expense(4, 2024, 3, 60.0, "Fuel"),
        ])
    }

    #[test]
    fn test_no_transactions_is_not_enough_data() {
        let store = InMemoryStore::default();
        let engine = ForecastEngine::without_model(&store);
        assert!(matches!(
            engine.forecast_next_month(),
            Err(ForecastError::NotEnoughData)
        ));
        assert_eq!(engine.readiness().unwrap(), ForecastReadiness::NoData);
    }

    #[test]
    fn test_income_only_is_not_enough_data() {
        let store = InMemoryStore::new(vec![
            record(1, 2024, 1, 3000.0, "Salary", TransactionType::Income),
            record(2, 2024, 2, 3000.0, "Salary", TransactionType::Income),
            record(3, 2024, 3, 3000.0, "Salary", TransactionType::Income),
        ]);
        let engine = ForecastEngine::without_model(&store);
        assert!(matches!(
            engine.forecast_next_month(),
            Err(ForecastError::NotEnoughData)
        ));
    }

    #[test]
    fn test_one_month_is_heuristic_at_0_3() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 2, 40.0, "Food"),
            expense(2, 2024, 2, 10.0, "Food"),
            expense(3, 2024, 2, 75.0, "Rent"),
        ]);
        let engine = ForecastEngine::without_model(&store).with_reference_date(march_15());
        let forecasts = engine.forecast_next_month().unwrap();

        assert_eq!(forecasts.len(), 2);
        for f in &forecasts {
            assert!(f.is_heuristic);
            assert_eq!(f.confidence, 0.3);
        }
        assert_eq!(forecasts[0].category_name, "Rent");
        assert_eq!(forecasts[1].predicted_amount, 50.0);
    }

    #[test]
    fn test_two_months_is_heuristic_at_0_5_with_category_mean() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 100.0, "Food"),
            expense(2, 2024, 2, 300.0, "Food"),
            expense(3, 2024, 2, 30.0, "Fuel"),
        ]);
        let engine = ForecastEngine::without_model(&store);
        let forecasts = engine.forecast_next_month().unwrap();

        assert!(forecasts.iter().all(|f| f.is_heuristic && f.confidence == 0.5));

        let food = forecasts.iter().find(|f| f.category_name == "Food").unwrap();
        assert_eq!(food.predicted_amount, 200.0);
        assert_eq!(food.historical_average, 200.0);

        // Fuel only appears in one month: mean over its own months
        let fuel = forecasts.iter().find(|f| f.category_name == "Fuel").unwrap();
        assert_eq!(fuel.predicted_amount, 30.0);

        assert_eq!(
            engine.readiness().unwrap(),
            ForecastReadiness::Collecting {
                months: 2,
                required: 3
            }
        );
    }

    #[test]
    fn test_heuristic_does_not_need_model() {
        let store = InMemoryStore::new(vec![expense(1, 2024, 1, 5.0, "Misc")]);
        let engine = ForecastEngine::new(&store, predictor(|_| panic!("model must not be called")));
        assert!(engine.forecast_next_month().is_ok());
    }

    #[test]
    fn test_model_tier_without_model_is_unavailable() {
        let store = three_month_store();
        let engine = ForecastEngine::without_model(&store);
        assert!(matches!(
            engine.forecast_next_month(),
            Err(ForecastError::ModelUnavailable(_))
        ));
        assert_eq!(
            engine.readiness().unwrap(),
            ForecastReadiness::Ready { months: 3 }
        );
    }

    #[test]
    fn test_missing_model_file_is_unavailable() {
        let store = three_month_store();
        let engine = ForecastEngine::with_model_path(&store, Path::new("/nonexistent/model.json"));
        assert!(!engine.model_state().is_loaded());
        assert!(matches!(
            engine.forecast_next_month(),
            Err(ForecastError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_model_receives_target_month_features() {
        let store = three_month_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_model = Arc::clone(&seen);

        let engine = ForecastEngine::new(
            &store,
            predictor(move |input| {
                seen_in_model.lock().unwrap().push(input.clone());
                Ok(input.trailing_three_month_average)
            }),
        )
        .with_reference_date(march_15());

        let forecasts = engine.forecast_next_month().unwrap();
        let inputs = seen.lock().unwrap();
        let food = inputs.iter().find(|i| i.category == "Food").unwrap();

        // Target is April 2024; window is Jan-Mar
        assert_eq!(food.year, 2024);
        assert_eq!(food.month, 4);
        assert_eq!(food.season, Season::Spring);
        assert_eq!(food.trailing_three_month_average, 200.0);

        let food = forecasts.iter().find(|f| f.category_name == "Food").unwrap();
        assert!(!food.is_heuristic);
        assert_eq!(food.predicted_amount, 200.0);
        assert_eq!(food.historical_average, 200.0);
        assert_eq!(food.confidence, 1.0);
    }

    #[test]
    fn test_target_month_rolls_over_year() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 10, 10.0, "Gifts"),
            expense(2, 2024, 11, 20.0, "Gifts"),
            expense(3, 2024, 12, 30.0, "Gifts"),
        ]);
        let seen = Arc::new(Mutex::new(None));
        let seen_in_model = Arc::clone(&seen);

        let engine = ForecastEngine::new(
            &store,
            predictor(move |input| {
                *seen_in_model.lock().unwrap() = Some(input.clone());
                Ok(1.0)
            }),
        )
        .with_reference_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        engine.forecast_next_month().unwrap();
        let input = seen.lock().unwrap().clone().unwrap();
        assert_eq!((input.year, input.month), (2025, 1));
        assert_eq!(input.season, Season::Winter);
        assert_eq!(input.trailing_three_month_average, 20.0);
    }

    #[test]
    fn test_negative_prediction_is_clamped() {
        let store = three_month_store();
        let engine = ForecastEngine::new(&store, predictor(|_| Ok(-125.0)))
            .with_reference_date(march_15());

        let forecasts = engine.forecast_next_month().unwrap();
        assert!(!forecasts.is_empty());
        for f in forecasts {
            assert_eq!(f.predicted_amount, 0.0);
            assert!(f.confidence >= 0.5 && f.confidence <= 1.0);
        }
    }

    #[test]
    fn test_failed_category_is_omitted() {
        let store = three_month_store();
        let engine = ForecastEngine::new(
            &store,
            predictor(|input| {
                if input.category == "Fuel" {
                    Err(Error::Prediction("unknown category".into()))
                } else {
                    Ok(250.0)
                }
            }),
        )
        .with_reference_date(march_15());

        let forecasts = engine.forecast_next_month().unwrap();
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].category_name, "Food");

        assert!(matches!(
            engine.forecast_for_category("Fuel"),
            Err(ForecastError::NotEnoughData)
        ));
        assert!(engine.forecast_for_category("Food").is_ok());
    }

    #[test]
    fn test_non_finite_prediction_is_omitted() {
        let store = three_month_store();
        let engine = ForecastEngine::new(
            &store,
            predictor(|input| {
                if input.category == "Food" {
                    Ok(f64::NAN)
                } else {
                    Ok(10.0)
                }
            }),
        );

        let forecasts = engine.forecast_next_month().unwrap();
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].category_name, "Fuel");
    }

    #[test]
    fn test_all_predictions_failing_yields_empty_batch() {
        let store = three_month_store();
        let engine = ForecastEngine::new(
            &store,
            predictor(|_| Err(Error::Prediction("offline".into()))),
        );
        assert!(engine.forecast_next_month().unwrap().is_empty());
    }

    #[test]
    fn test_results_sorted_descending() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 50.0, "A"),
            expense(2, 2024, 1, 200.0, "B"),
            expense(3, 2024, 1, 10.0, "C"),
        ]);
        let engine = ForecastEngine::without_model(&store);
        let names: Vec<String> = engine
            .forecast_next_month()
            .unwrap()
            .into_iter()
            .map(|f| f.category_name)
            .collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_model_results_sorted_descending() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 1.0, "A"),
            expense(2, 2024, 2, 1.0, "B"),
            expense(3, 2024, 3, 1.0, "C"),
        ]);
        let engine = ForecastEngine::new(
            &store,
            predictor(|input| {
                Ok(match input.category.as_str() {
                    "A" => 50.0,
                    "B" => 200.0,
                    _ => 10.0,
                })
            }),
        );
        let amounts: Vec<f64> = engine
            .forecast_next_month()
            .unwrap()
            .iter()
            .map(|f| f.predicted_amount)
            .collect();
        assert_eq!(amounts, vec![200.0, 50.0, 10.0]);
    }

    #[test]
    fn test_category_lookup_matches_batch() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 80.0, "Food"),
            expense(2, 2024, 1, 20.0, "Fuel"),
        ]);
        let engine = ForecastEngine::without_model(&store);
        let batch = engine.forecast_next_month().unwrap();
        let single = engine.forecast_for_category("Fuel").unwrap();
        assert_eq!(batch.iter().find(|f| f.category_name == "Fuel"), Some(&single));

        assert!(matches!(
            engine.forecast_for_category("Travel"),
            Err(ForecastError::NotEnoughData)
        ));
    }

    #[test]
    fn test_store_failure_propagates() {
        let store = FailingStore;
        let engine = ForecastEngine::without_model(&store);
        assert!(matches!(
            engine.forecast_next_month(),
            Err(ForecastError::AggregationFailed(_))
        ));
        assert!(matches!(
            engine.forecast_for_category("Food"),
            Err(ForecastError::AggregationFailed(_))
        ));
        assert!(engine.readiness().is_err());
    }

    #[test]
    fn test_deviation_confidence_in_model_tier() {
        let store = three_month_store();
        // Food trailing average is 200; 240 is 20% off
        let engine = ForecastEngine::new(&store, predictor(|_| Ok(240.0)))
            .with_reference_date(march_15());

        let food = engine.forecast_for_category("Food").unwrap();
        assert!((food.confidence - 0.9).abs() < 1e-12);

        // Fuel has no history before April's window other than March: avg 60
        let fuel = engine.forecast_for_category("Fuel").unwrap();
        assert_eq!(fuel.historical_average, 60.0);
        assert_eq!(fuel.confidence, 0.5);
    }

    #[test]
    fn test_readiness_from_months() {
        assert_eq!(ForecastReadiness::from_months(0), ForecastReadiness::NoData);
        assert_eq!(
            ForecastReadiness::from_months(1),
            ForecastReadiness::Collecting {
                months: 1,
                required: 3
            }
        );
        assert_eq!(
            ForecastReadiness::from_months(7),
            ForecastReadiness::Ready { months: 7 }
        );
    }
}
