//! Expense data aggregation
//!
//! Turns raw transactions into a month x category time series. Buckets are
//! rebuilt from the store on every call; transactions change often enough that
//! a cache would silently serve stale forecasts.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::calendar::YearMonth;
use crate::error::{Error, ForecastError, Result};
use crate::models::{MonthlyExpenseBucket, TransactionRecord, TransactionType};
use crate::store::TransactionStore;

/// Distinct months of history needed for model-backed forecasts and training export
pub const MIN_MONTHS_FOR_MODEL: usize = 3;

/// Number of preceding months averaged into the trailing feature
pub const TRAILING_WINDOW_MONTHS: usize = 3;

/// Monthly totals indexed by category, then month
#[derive(Debug, Default, Clone)]
pub struct MonthlyTotals {
    by_category: BTreeMap<String, BTreeMap<YearMonth, f64>>,
}

impl MonthlyTotals {
    /// Sum expense records per (category, month). Income is ignored.
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut totals = Self::default();
        for record in records
            .iter()
            .filter(|r| r.kind == TransactionType::Expense)
        {
            *totals
                .by_category
                .entry(record.category_name.clone())
                .or_default()
                .entry(YearMonth::of(&record.date))
                .or_insert(0.0) += record.amount;
        }
        totals
    }

    pub fn from_buckets(buckets: &[MonthlyExpenseBucket]) -> Self {
        let mut totals = Self::default();
        for bucket in buckets {
            if let Some(month) = YearMonth::new(bucket.year, bucket.month) {
                *totals
                    .by_category
                    .entry(bucket.category_name.clone())
                    .or_default()
                    .entry(month)
                    .or_insert(0.0) += bucket.total_amount;
            }
        }
        totals
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.by_category.keys().map(String::as_str)
    }

    pub fn total(&self, category: &str, month: YearMonth) -> Option<f64> {
        self.by_category.get(category)?.get(&month).copied()
    }

    /// Every month total recorded for a category, chronologically
    pub fn category_totals(&self, category: &str) -> Vec<f64> {
        self.by_category
            .get(category)
            .map(|months| months.values().copied().collect())
            .unwrap_or_default()
    }

    /// Mean of the category's totals over the three months before `month`
    ///
    /// `month` itself never contributes. Months with no entry for the category
    /// are left out of the denominator rather than counted as zero; with no
    /// entries at all the average is 0.
    pub fn trailing_average(&self, category: &str, month: YearMonth) -> f64 {
        let values: Vec<f64> = month
            .preceding(TRAILING_WINDOW_MONTHS)
            .into_iter()
            .filter_map(|m| self.total(category, m))
            .collect();

        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }

    /// Distinct months with any expense, across all categories
    pub fn distinct_months(&self) -> usize {
        self.by_category
            .values()
            .flat_map(|months| months.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// One bucket per (year, month, category), ordered by month then category
    pub fn to_buckets(&self) -> Vec<MonthlyExpenseBucket> {
        let mut buckets: Vec<MonthlyExpenseBucket> = self
            .by_category
            .iter()
            .flat_map(|(category, months)| {
                months.iter().map(move |(month, total)| MonthlyExpenseBucket {
                    year: month.year(),
                    month: month.month(),
                    category_name: category.clone(),
                    total_amount: *total,
                    trailing_three_month_average: self.trailing_average(category, *month),
                    season: month.season(),
                })
            })
            .collect();

        buckets.sort_by(|a, b| {
            (a.year, a.month, &a.category_name).cmp(&(b.year, b.month, &b.category_name))
        });
        buckets
    }
}

/// Build buckets straight from a set of records
pub fn build_buckets(records: &[TransactionRecord]) -> Vec<MonthlyExpenseBucket> {
    MonthlyTotals::from_records(records).to_buckets()
}

/// Count distinct (year, month) keys across all categories
pub fn distinct_months(buckets: &[MonthlyExpenseBucket]) -> usize {
    buckets
        .iter()
        .map(|b| (b.year, b.month))
        .collect::<BTreeSet<_>>()
        .len()
}

/// One row of the offline training table
#[derive(Debug, Serialize)]
struct TrainingRow<'a> {
    year: i32,
    month: u32,
    category: &'a str,
    #[serde(rename = "averageLastThreeMonths")]
    average_last_three_months: f64,
    season: u8,
    #[serde(rename = "totalAmount")]
    total_amount: f64,
}

/// Derives expense buckets from a transaction store
pub struct ExpenseAggregator<'a> {
    store: &'a dyn TransactionStore,
}

impl<'a> ExpenseAggregator<'a> {
    pub fn new(store: &'a dyn TransactionStore) -> Self {
        Self { store }
    }

    /// Fetch expenses and group them into monthly buckets
    ///
    /// An empty store yields an empty list. Only a failed fetch is an error.
    pub fn aggregate_monthly_expenses(
        &self,
    ) -> std::result::Result<Vec<MonthlyExpenseBucket>, ForecastError> {
        let records = self
            .store
            .fetch_by_type(TransactionType::Expense)
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch transactions for aggregation");
                ForecastError::AggregationFailed(Box::new(e))
            })?;

        let buckets = build_buckets(&records);
        info!(
            transactions = records.len(),
            buckets = buckets.len(),
            "Aggregated monthly expenses"
        );
        Ok(buckets)
    }

    /// Distinct months of expense history across all categories
    pub fn months_of_data_count(&self) -> std::result::Result<usize, ForecastError> {
        Ok(distinct_months(&self.aggregate_monthly_expenses()?))
    }

    pub fn has_enough_data_for_forecasting(&self) -> std::result::Result<bool, ForecastError> {
        Ok(self.months_of_data_count()? >= MIN_MONTHS_FOR_MODEL)
    }

    /// Write the training table as CSV, returning the number of data rows
    ///
    /// Header: `year,month,category,averageLastThreeMonths,season,totalAmount`.
    /// Fails with `InsufficientData` below three distinct months.
    pub fn export_training_table<W: Write>(&self, writer: W) -> Result<usize> {
        let buckets = self.training_buckets()?;
        write_training_table(&buckets, writer)
    }

    /// Write the training table to a file
    ///
    /// Rows go to a temp file beside `path` that is renamed into place once
    /// complete. No file is created when the history is too short, and a
    /// failed write leaves any existing file untouched.
    pub fn export_training_table_to_path(&self, path: &Path) -> Result<usize> {
        let buckets = self.training_buckets()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        let rows = write_training_table(&buckets, BufWriter::new(temp.as_file_mut()))?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!(rows, path = %path.display(), "Exported training table");
        Ok(rows)
    }

    fn training_buckets(&self) -> Result<Vec<MonthlyExpenseBucket>> {
        let buckets = self.aggregate_monthly_expenses()?;
        let months = distinct_months(&buckets);
        if months < MIN_MONTHS_FOR_MODEL {
            return Err(Error::InsufficientData {
                months,
                required: MIN_MONTHS_FOR_MODEL,
            });
        }
        Ok(buckets)
    }
}

fn write_training_table<W: Write>(buckets: &[MonthlyExpenseBucket], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bucket in buckets {
        wtr.serialize(TrainingRow {
            year: bucket.year,
            month: bucket.month,
            category: &bucket.category_name,
            average_last_three_months: bucket.trailing_three_month_average,
            season: bucket.season.code(),
            total_amount: bucket.total_amount,
        })?;
    }
    wtr.flush()?;
    Ok(buckets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Season;
    use crate::store::InMemoryStore;
    use chrono::NaiveDate;

    fn expense(id: i64, y: i32, m: u32, d: u32, amount: f64, category: &str) -> TransactionRecord {
        TransactionRecord {
            id,
            amount,
            kind: TransactionType::Expense,
            date: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(18, 45, 0)
                .unwrap(),
            category_name: category.to_string(),
            description: format!("tx {}", id),
        }
    }

    fn income(id: i64, y: i32, m: u32, amount: f64) -> TransactionRecord {
        TransactionRecord {
            kind: TransactionType::Income,
            ..expense(id, y, m, 1, amount, "Salary")
        }
    }

    struct FailingStore;

    impl TransactionStore for FailingStore {
        fn fetch_all(&self) -> Result<Vec<TransactionRecord>> {
            Err(Error::InvalidData("store offline".into()))
        }
    }

    fn bucket<'b>(
        buckets: &'b [MonthlyExpenseBucket],
        y: i32,
        m: u32,
        category: &str,
    ) -> &'b MonthlyExpenseBucket {
        buckets
            .iter()
            .find(|b| b.year == y && b.month == m && b.category_name == category)
            .unwrap()
    }

    #[test]
    fn test_groups_and_sums_per_month_and_category() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 3, 10.0, "Food"),
            expense(2, 2024, 1, 28, 15.5, "Food"),
            expense(3, 2024, 1, 5, 40.0, "Fuel"),
            expense(4, 2024, 2, 1, 7.0, "Food"),
        ]);
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(bucket(&buckets, 2024, 1, "Food").total_amount, 25.5);
        assert_eq!(bucket(&buckets, 2024, 1, "Fuel").total_amount, 40.0);
        assert_eq!(bucket(&buckets, 2024, 2, "Food").total_amount, 7.0);
    }

    #[test]
    fn test_keys_are_unique() {
        let store = InMemoryStore::new(
            (0..20)
                .map(|i| expense(i, 2024, 1 + (i as u32 % 3), 1 + i as u32, 1.0, "Food"))
                .collect(),
        );
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();

        let keys: BTreeSet<_> = buckets
            .iter()
            .map(|b| (b.year, b.month, b.category_name.clone()))
            .collect();
        assert_eq!(keys.len(), buckets.len());
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn test_income_is_ignored() {
        let store = InMemoryStore::new(vec![
            income(1, 2024, 1, 5000.0),
            income(2, 2024, 2, 5000.0),
        ]);
        let aggregator = ExpenseAggregator::new(&store);

        assert!(aggregator.aggregate_monthly_expenses().unwrap().is_empty());
        assert_eq!(aggregator.months_of_data_count().unwrap(), 0);
    }

    #[test]
    fn test_empty_store_is_not_a_failure() {
        let store = InMemoryStore::default();
        let aggregator = ExpenseAggregator::new(&store);
        assert!(aggregator.aggregate_monthly_expenses().unwrap().is_empty());
        assert!(!aggregator.has_enough_data_for_forecasting().unwrap());
    }

    #[test]
    fn test_store_failure_maps_to_aggregation_failed() {
        let store = FailingStore;
        let aggregator = ExpenseAggregator::new(&store);
        assert!(matches!(
            aggregator.aggregate_monthly_expenses(),
            Err(ForecastError::AggregationFailed(_))
        ));
        assert!(matches!(
            aggregator.months_of_data_count(),
            Err(ForecastError::AggregationFailed(_))
        ));
    }

    #[test]
    fn test_trailing_average_excludes_current_month() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 10, 100.0, "Food"),
            expense(2, 2024, 2, 10, 200.0, "Food"),
            expense(3, 2024, 3, 10, 300.0, "Food"),
            expense(4, 2024, 4, 10, 9999.0, "Food"),
        ]);
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();

        assert_eq!(bucket(&buckets, 2024, 1, "Food").trailing_three_month_average, 0.0);
        assert_eq!(bucket(&buckets, 2024, 2, "Food").trailing_three_month_average, 100.0);
        assert_eq!(bucket(&buckets, 2024, 3, "Food").trailing_three_month_average, 150.0);
        assert_eq!(bucket(&buckets, 2024, 4, "Food").trailing_three_month_average, 200.0);
    }

    #[test]
    fn test_trailing_average_skips_missing_months() {
        // Nothing in February: April's window (Jan, Feb, Mar) averages only two values
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 10, 100.0, "Food"),
            expense(2, 2024, 3, 10, 300.0, "Food"),
            expense(3, 2024, 4, 10, 50.0, "Food"),
        ]);
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();

        assert_eq!(bucket(&buckets, 2024, 4, "Food").trailing_three_month_average, 200.0);
    }

    #[test]
    fn test_trailing_average_is_per_category() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 10, 100.0, "Food"),
            expense(2, 2024, 2, 10, 30.0, "Fuel"),
        ]);
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();

        assert_eq!(bucket(&buckets, 2024, 2, "Fuel").trailing_three_month_average, 0.0);
    }

    #[test]
    fn test_trailing_window_crosses_year_boundary() {
        let totals = MonthlyTotals::from_records(&[
            expense(1, 2023, 11, 1, 30.0, "Gifts"),
            expense(2, 2023, 12, 1, 90.0, "Gifts"),
            expense(3, 2023, 10, 1, 1000.0, "Gifts"),
        ]);
        let feb = YearMonth::new(2024, 2).unwrap();
        // Window is Jan 2024, Dec 2023, Nov 2023
        assert_eq!(totals.trailing_average("Gifts", feb), 60.0);
    }

    #[test]
    fn test_season_assigned_per_bucket() {
        let store = InMemoryStore::new(vec![
            expense(1, 2023, 12, 1, 1.0, "Misc"),
            expense(2, 2024, 4, 1, 1.0, "Misc"),
            expense(3, 2024, 7, 1, 1.0, "Misc"),
            expense(4, 2024, 10, 1, 1.0, "Misc"),
        ]);
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();

        let seasons: Vec<Season> = buckets.iter().map(|b| b.season).collect();
        assert_eq!(
            seasons,
            vec![Season::Winter, Season::Spring, Season::Summer, Season::Fall]
        );
    }

    #[test]
    fn test_months_of_data_counts_across_categories() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 1, 1.0, "A"),
            expense(2, 2024, 1, 2, 1.0, "B"),
            expense(3, 2024, 2, 1, 1.0, "B"),
            expense(4, 2025, 2, 1, 1.0, "C"),
        ]);
        let aggregator = ExpenseAggregator::new(&store);
        assert_eq!(aggregator.months_of_data_count().unwrap(), 3);
        assert!(aggregator.has_enough_data_for_forecasting().unwrap());
    }

    #[test]
    fn test_buckets_are_chronological() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 3, 1, 1.0, "B"),
            expense(2, 2024, 1, 1, 1.0, "Z"),
            expense(3, 2024, 1, 1, 1.0, "A"),
        ]);
        let buckets = ExpenseAggregator::new(&store)
            .aggregate_monthly_expenses()
            .unwrap();
        let order: Vec<(u32, &str)> = buckets
            .iter()
            .map(|b| (b.month, b.category_name.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "A"), (1, "Z"), (3, "B")]);
    }

    #[test]
    fn test_export_requires_three_months() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 1, 10.0, "Food"),
            expense(2, 2024, 2, 1, 10.0, "Food"),
        ]);
        let mut out = Vec::new();
        let err = ExpenseAggregator::new(&store)
            .export_training_table(&mut out)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientData {
                months: 2,
                required: 3
            }
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 1, 100.0, "Food"),
            expense(2, 2024, 2, 1, 200.0, "Food"),
            expense(3, 2024, 3, 1, 300.0, "Food"),
            expense(4, 2024, 3, 2, 45.5, "Fuel"),
        ]);
        let mut out = Vec::new();
        let rows = ExpenseAggregator::new(&store)
            .export_training_table(&mut out)
            .unwrap();
        assert_eq!(rows, 4);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "year,month,category,averageLastThreeMonths,season,totalAmount"
        );
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "2024,1,Food,0.0,1,100.0");
        assert_eq!(lines[3], "2024,3,Food,150.0,2,300.0");
        assert_eq!(lines[4], "2024,3,Fuel,0.0,2,45.5");
    }

    #[test]
    fn test_export_to_path_does_not_create_file_when_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let store = InMemoryStore::new(vec![expense(1, 2024, 1, 1, 10.0, "Food")]);

        let result = ExpenseAggregator::new(&store).export_training_table_to_path(&path);
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_export_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let store = InMemoryStore::new(vec![
            expense(1, 2024, 1, 1, 10.0, "Food"),
            expense(2, 2024, 2, 1, 10.0, "Food"),
            expense(3, 2024, 3, 1, 10.0, "Food"),
        ]);

        let rows = ExpenseAggregator::new(&store)
            .export_training_table_to_path(&path)
            .unwrap();
        assert_eq!(rows, 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("year,month,category,averageLastThreeMonths,season,totalAmount"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    /// Accepts `limit` bytes, then fails every write
    struct FailingWriter {
        limit: usize,
        written: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written + buf.len() > self.limit {
                return Err(std::io::Error::other("disk full"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn three_month_store() -> InMemoryStore {
        InMemoryStore::new(vec![
            expense(1, 2024, 1, 1, 10.0, "Food"),
            expense(2, 2024, 2, 1, 10.0, "Food"),
            expense(3, 2024, 3, 1, 10.0, "Food"),
        ])
    }

    #[test]
    fn test_export_propagates_write_failure() {
        let store = three_month_store();
        let writer = FailingWriter {
            limit: 16,
            written: 0,
        };
        assert!(ExpenseAggregator::new(&store)
            .export_training_table(writer)
            .is_err());
    }

    #[test]
    fn test_failed_export_to_path_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail after all rows are written
        let path = dir.path().join("training.csv");
        std::fs::create_dir(&path).unwrap();

        let result = ExpenseAggregator::new(&three_month_store()).export_training_table_to_path(&path);
        assert!(result.is_err());
        assert!(path.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_export_to_path_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        std::fs::write(&path, "stale").unwrap();

        ExpenseAggregator::new(&three_month_store())
            .export_training_table_to_path(&path)
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("year,month"));
        assert_eq!(content.lines().count(), 4);
    }
}
