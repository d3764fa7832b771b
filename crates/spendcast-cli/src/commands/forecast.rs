//! Bucket and forecast commands

use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::db::Database;
use spendcast_core::error::ForecastError;
use spendcast_core::forecast::{ExpenseAggregator, ForecastEngine, ForecastReadiness};
use spendcast_core::models::CategoryForecast;

use super::{readiness_message, truncate};

pub fn cmd_buckets(db: &Database) -> Result<()> {
    let buckets = ExpenseAggregator::new(db)
        .aggregate_monthly_expenses()
        .context("Failed to aggregate expenses")?;

    if buckets.is_empty() {
        println!("No expenses recorded yet.");
        return Ok(());
    }

    println!();
    println!("🗓️  Monthly Expenses");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<7}  {:<18} {:>10} {:>12}  {}",
        "Month", "Category", "Total", "Trailing 3m", "Season"
    );

    for b in buckets {
        println!(
            "   {}-{:02}  {:<18} {:>10.2} {:>12.2}  {}",
            b.year,
            b.month,
            truncate(&b.category_name, 18),
            b.total_amount,
            b.trailing_three_month_average,
            b.season
        );
    }

    Ok(())
}

/// Forecast next month
///
/// Expected shortfalls (no history, no model, unknown category) are reported
/// as messages. Only a failed store read is an error.
pub fn cmd_forecast(
    db: &Database,
    model_path: Option<&Path>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let engine = match model_path {
        Some(path) => ForecastEngine::with_model_path(db, path),
        None => ForecastEngine::without_model(db),
    };

    let result = match category {
        Some(name) => engine.forecast_for_category(name).map(|f| vec![f]),
        None => engine.forecast_next_month(),
    };

    let forecasts = match result {
        Ok(forecasts) => forecasts,
        Err(ForecastError::NotEnoughData) => {
            let readiness = engine
                .readiness()
                .context("Failed to read transaction history")?;
            println!("{}", not_enough_data_message(category, readiness));
            return Ok(());
        }
        Err(ForecastError::ModelUnavailable(reason)) => {
            println!("⚠️  Forecast unavailable: the prediction model could not be loaded.");
            println!("   {}", reason);
            println!("   Pass --model model.json or set SPENDCAST_MODEL_PATH.");
            return Ok(());
        }
        Err(e @ ForecastError::AggregationFailed(_)) => {
            return Err(e).context("Failed to read transaction history");
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&forecasts)?);
        return Ok(());
    }

    print_forecasts(&engine.target_month().to_string(), &forecasts);
    Ok(())
}

/// Message for a forecast that came back with `NotEnoughData`
///
/// An empty history always reads as "no data yet", even when a single
/// category was asked for.
pub fn not_enough_data_message(category: Option<&str>, readiness: ForecastReadiness) -> String {
    match (category, readiness) {
        (_, ForecastReadiness::NoData) | (None, _) => readiness_message(readiness),
        (Some(name), _) => format!("No forecast available for '{}'.", name),
    }
}

fn print_forecasts(target: &str, forecasts: &[CategoryForecast]) {
    println!();
    println!("🔮 Forecast for {}", target);
    println!("   ─────────────────────────────────────────────────────────────");

    if forecasts.is_empty() {
        println!("   No category could be forecast.");
        return;
    }

    for f in forecasts {
        println!(
            "   {:<18} {:>10.2}  (avg {:>9.2}, confidence {:>3.0}%)",
            truncate(&f.category_name, 18),
            f.predicted_amount,
            f.historical_average,
            f.confidence * 100.0
        );
    }

    let total: f64 = forecasts.iter().map(|f| f.predicted_amount).sum();
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:<18} {:>10.2}", "Total", total);

    if forecasts.iter().any(|f| f.is_heuristic) {
        println!();
        println!("   💡 Based on less than 3 months of history; expect lower accuracy.");
    }
}
