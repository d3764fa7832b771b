//! CSV import for transaction history
//!
//! Expected header: `date,description,amount[,type][,category]`. Column order is
//! taken from the header, so extra columns are ignored.

use std::collections::HashMap;
use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionType};

/// Category assigned to rows without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    kind: Option<usize>,
    category: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        Ok(Self {
            date: find("date").ok_or_else(|| Error::Import("Missing 'date' column".into()))?,
            description: find("description")
                .ok_or_else(|| Error::Import("Missing 'description' column".into()))?,
            amount: find("amount")
                .ok_or_else(|| Error::Import("Missing 'amount' column".into()))?,
            kind: find("type"),
            category: find("category"),
        })
    }
}

/// Parse CSV data into transactions ready for insertion
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut transactions = Vec::new();
    // Identical rows seen so far in this file, keyed by their base hash
    let mut seen: HashMap<String, u32> = HashMap::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = line + 2;

        let date_str = record
            .get(columns.date)
            .ok_or_else(|| Error::Import(format!("Line {}: missing date", line)))?;
        let date = parse_date(date_str)
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;

        let description = record
            .get(columns.description)
            .unwrap_or_default()
            .to_string();

        let amount_str = record
            .get(columns.amount)
            .ok_or_else(|| Error::Import(format!("Line {}: missing amount", line)))?;
        let signed_amount = parse_amount(amount_str)
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;

        let explicit_kind = match columns.kind.and_then(|i| record.get(i)) {
            Some(s) if !s.is_empty() => Some(
                s.parse::<TransactionType>()
                    .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?,
            ),
            _ => None,
        };

        // Without a type column, follow the bank-statement convention:
        // negative amounts are money going out.
        let kind = explicit_kind.unwrap_or(if signed_amount < 0.0 {
            TransactionType::Expense
        } else {
            TransactionType::Income
        });
        let amount = signed_amount.abs();

        let category_name = columns
            .category
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string();

        let base_hash = generate_hash(&date, &description, amount, kind);
        let occurrence = seen.entry(base_hash.clone()).or_insert(0);
        let import_hash = if *occurrence == 0 {
            base_hash
        } else {
            generate_hash_with_occurrence(&date, &description, amount, kind, *occurrence)
        };
        *occurrence += 1;

        transactions.push(NewTransaction {
            date,
            description,
            amount,
            kind,
            category_name,
            import_hash,
        });
    }

    debug!(count = transactions.len(), "Parsed CSV transactions");
    Ok(transactions)
}

/// Generate a unique hash for deduplication
pub fn generate_hash(
    date: &NaiveDateTime,
    description: &str,
    amount: f64,
    kind: TransactionType,
) -> String {
    generate_hash_with_occurrence(date, description, amount, kind, 0)
}

/// Generate a hash for the n-th identical transaction
///
/// Occurrence 0 hashes the same as [`generate_hash`]. Later occurrences keep
/// two same-day purchases with identical details apart while re-importing
/// the same file still maps every row onto its earlier hash.
pub fn generate_hash_with_occurrence(
    date: &NaiveDateTime,
    description: &str,
    amount: f64,
    kind: TransactionType,
    occurrence: u32,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(kind.as_str().as_bytes());
    if occurrence > 0 {
        hasher.update(occurrence.to_be_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Parse a date or date-time. Date-only values land at midnight.
pub fn parse_date(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_time(chrono::NaiveTime::MIN));
        }
    }

    Err(Error::Import(format!("Invalid date format: {}", s)))
}

/// Parse an amount, tolerating currency symbols and thousands separators
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    // Accounting notation: (12.34) means -12.34
    let (cleaned, negate) = match cleaned.strip_prefix('(').and_then(|c| c.strip_suffix(')')) {
        Some(inner) => (inner.to_string(), true),
        None => (cleaned, false),
    };

    let value: f64 = cleaned
        .parse()
        .map_err(|_| Error::Import(format!("Invalid amount: {}", s)))?;

    if !value.is_finite() {
        return Err(Error::Import(format!("Invalid amount: {}", s)));
    }

    Ok(if negate { -value } else { value })
}
