//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendcast - Forecast next month's spending
#[derive(Parser)]
#[command(name = "spendcast")]
#[command(about = "Per-category expense forecasts from your transaction history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendcast.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to the data dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Record a single transaction
    Add {
        /// Date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[arg(long)]
        date: String,

        /// Amount (positive)
        #[arg(long)]
        amount: f64,

        /// Description
        #[arg(long)]
        description: String,

        /// Category name
        #[arg(long)]
        category: String,

        /// Record as income instead of expense
        #[arg(long)]
        income: bool,
    },

    /// Delete a transaction by id
    Delete {
        #[arg(long)]
        id: i64,
    },

    /// Import transactions from CSV (date,description,amount[,type][,category])
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show database and forecast readiness
    Status,

    /// Show monthly expense buckets
    Buckets,

    /// Forecast next month's spending per category
    Forecast {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,

        /// Linear model artifact (overrides config and SPENDCAST_MODEL_PATH)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Export the monthly training table as CSV
    ExportTraining {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Suggest a category for a transaction description
    Categorize {
        /// Transaction description
        description: String,

        /// Treat as income instead of expense
        #[arg(long)]
        income: bool,

        /// Number of alternatives to show (defaults to config top_k)
        #[arg(long)]
        top: Option<usize>,
    },
}
