//! Transaction operations

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DATE_FORMAT};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionRecord, TransactionType};
use crate::store::TransactionStore;

const SELECT_COLUMNS: &str = "SELECT id, date, description, amount, kind, category FROM transactions";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let date_str: String = row.get(1)?;
    let date = NaiveDateTime::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let kind_str: String = row.get(4)?;
    let kind = kind_str.parse::<TransactionType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(Error::InvalidData(e)),
        )
    })?;

    Ok(TransactionRecord {
        id: row.get(0)?,
        date,
        description: row.get(2)?,
        amount: row.get(3)?,
        kind,
        category_name: row.get(5)?,
    })
}

impl Database {
    /// Insert a transaction (skips duplicates based on import_hash)
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Option<i64>> {
        tx.validate()?;
        let conn = self.conn()?;

        // Check for duplicate
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None); // Duplicate, skip
        }

        conn.execute(
            r#"
            INSERT INTO transactions (date, description, amount, kind, category, import_hash)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.date.format(DATE_FORMAT).to_string(),
                tx.description,
                tx.amount,
                tx.kind.as_str(),
                tx.category_name.trim(),
                tx.import_hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Delete a transaction by id
    pub fn delete_transaction(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Get a single transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Option<TransactionRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_COLUMNS),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// List most recent transactions first
    pub fn list_transactions(&self, limit: i64) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY date DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct expense category names, alphabetically
    ///
    /// This is the label set offered to the transaction classifier.
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM transactions WHERE kind = 'expense' ORDER BY category",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }
}

impl TransactionStore for Database {
    fn fetch_all(&self) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY date, id", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn fetch_by_type(&self, kind: TransactionType) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE kind = ? ORDER BY date, id",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![kind.as_str()], row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
