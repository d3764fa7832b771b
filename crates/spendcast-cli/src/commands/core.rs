//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::db::Database;

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let count = db.count_transactions()?;

    println!("✅ Database initialized successfully! ({} transactions)", count);
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: spendcast import --file statement.csv");
    println!("  2. Check readiness:     spendcast status");
    println!("  3. Forecast:            spendcast forecast");

    Ok(())
}
