//! Status command: database stats and forecast readiness

use std::path::Path;

use anyhow::Result;
use spendcast_core::forecast::{ForecastEngine, ForecastReadiness};

use super::open_db;

/// One-line description of how far the history is from model forecasts
pub fn readiness_message(readiness: ForecastReadiness) -> String {
    match readiness {
        ForecastReadiness::NoData => {
            "No expenses yet. Add or import transactions to get a forecast.".to_string()
        }
        ForecastReadiness::Collecting { months, required } => format!(
            "{} of {} months collected. Forecasts are estimates until then.",
            months, required
        ),
        ForecastReadiness::Ready { months } => {
            format!("{} months of history. Model forecasts available.", months)
        }
    }
}

pub fn cmd_status(db_path: &Path) -> Result<()> {
    println!();
    println!("📊 Spendcast Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database: {}", db_path.display());

    if !db_path.exists() {
        println!("   (database not initialized, run: spendcast init)");
        return Ok(());
    }

    let db = open_db(db_path)?;
    println!("   Transactions: {}", db.count_transactions()?);
    println!("   Expense categories: {}", db.list_categories()?.len());

    let engine = ForecastEngine::without_model(&db);
    match engine.readiness() {
        Ok(readiness) => {
            let icon = match readiness {
                ForecastReadiness::NoData => "⚪",
                ForecastReadiness::Collecting { .. } => "🟡",
                ForecastReadiness::Ready { .. } => "🟢",
            };
            println!();
            println!("   {} {}", icon, readiness_message(readiness));
        }
        Err(e) => {
            println!();
            println!("   ❌ Could not read history: {}", e);
        }
    }

    Ok(())
}
