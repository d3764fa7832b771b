//! Training table export command

use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::db::Database;
use spendcast_core::forecast::ExpenseAggregator;

pub fn cmd_export_training(db: &Database, output: &Path) -> Result<usize> {
    println!("📤 Exporting training table to {}...", output.display());

    let rows = ExpenseAggregator::new(db)
        .export_training_table_to_path(output)
        .context("Failed to export training table")?;

    println!("✅ Wrote {} rows", rows);
    Ok(rows)
}
