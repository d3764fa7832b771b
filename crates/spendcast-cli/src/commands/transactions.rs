//! Transaction command implementations

use anyhow::{Context, Result};
use spendcast_core::db::Database;
use spendcast_core::import::{generate_hash_with_occurrence, parse_date};
use spendcast_core::models::{NewTransaction, TransactionType};

use super::truncate;

pub fn cmd_add(
    db: &Database,
    date: &str,
    amount: f64,
    description: &str,
    category: &str,
    income: bool,
) -> Result<()> {
    let date = parse_date(date).context("Invalid --date")?;
    let kind = if income {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };

    let mut tx = NewTransaction {
        date,
        description: description.trim().to_string(),
        amount,
        kind,
        category_name: category.trim().to_string(),
        import_hash: String::new(),
    };

    // A manual add is always a new purchase, so step past any identical
    // transaction already recorded instead of skipping.
    let mut occurrence = 0;
    let id = loop {
        tx.import_hash =
            generate_hash_with_occurrence(&date, &tx.description, amount, kind, occurrence);
        if let Some(id) = db
            .insert_transaction(&tx)
            .context("Failed to add transaction")?
        {
            break id;
        }
        occurrence += 1;
    };

    println!(
        "✅ Added {} #{}: ${:.2} {} ({})",
        kind, id, amount, tx.description, tx.category_name
    );

    Ok(())
}

pub fn cmd_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_transaction(id)
        .with_context(|| format!("Failed to delete transaction {}", id))?;
    println!("🗑️  Deleted transaction {}", id);
    Ok(())
}

pub fn cmd_list(db: &Database, limit: i64) -> Result<()> {
    let transactions = db.list_transactions(limit)?;

    if transactions.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  spendcast import --file statement.csv");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.kind {
            TransactionType::Expense => format!("\x1b[31m-${:.2}\x1b[0m", tx.amount), // Red for expenses
            TransactionType::Income => format!("\x1b[32m+${:.2}\x1b[0m", tx.amount), // Green for income
        };

        println!(
            "   [{:>4}] {} │ {:>10} │ {:<14} │ {}",
            tx.id,
            tx.date.date(),
            amount_str,
            truncate(&tx.category_name, 14),
            truncate(&tx.description, 34)
        );
    }

    Ok(())
}
