//! Spendcast CLI - Expense forecaster
//!
//! Usage:
//!   spendcast init                    Initialize database
//!   spendcast import --file CSV       Import transactions
//!   spendcast forecast                Forecast next month per category
//!   spendcast categorize "DESC"       Suggest a category

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use spendcast_core::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Add {
            date,
            amount,
            description,
            category,
            income,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_add(&db, &date, amount, &description, &category, income)
        }
        Commands::Delete { id } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_delete(&db, id)
        }
        Commands::Import { file } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, &file).map(|_| ())
        }
        Commands::List { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_list(&db, limit)
        }
        Commands::Status => commands::cmd_status(&cli.db),
        Commands::Buckets => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_buckets(&db)
        }
        Commands::Forecast {
            category,
            model,
            json,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db)?;
            let model_path = model.or(config.forecast.model_path);
            commands::cmd_forecast(&db, model_path.as_deref(), category.as_deref(), json)
        }
        Commands::ExportTraining { output } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_export_training(&db, &output).map(|_| ())
        }
        Commands::Categorize {
            description,
            income,
            top,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db)?;
            commands::cmd_categorize(&db, &config, &description, income, top)
                .await
                .map(|_| ())
        }
    }
}
