//! CSV import command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::db::Database;
use spendcast_core::import::parse_csv;

/// Import a CSV file, returning (imported, skipped)
pub fn cmd_import(db: &Database, file: &Path) -> Result<(usize, usize)> {
    println!("📥 Importing from {}...", file.display());

    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let transactions = parse_csv(csv_file).context("Failed to parse CSV")?;

    println!("   Found {} transactions", transactions.len());

    let mut imported = 0;
    let mut skipped = 0;

    for tx in &transactions {
        match db.insert_transaction(tx)? {
            Some(_) => imported += 1,
            None => skipped += 1,
        }
    }

    println!("✅ Imported {} new transactions", imported);
    if skipped > 0 {
        println!("   Skipped {} duplicates", skipped);
    }

    Ok((imported, skipped))
}
