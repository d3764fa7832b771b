//! Categorize command: suggest a category for a description

use anyhow::{Context, Result};
use spendcast_core::ai::{ClassifierClient, TextClassifier};
use spendcast_core::categorize::{CategorizationGateway, CategoryPrediction};
use spendcast_core::config::Config;
use spendcast_core::db::Database;
use spendcast_core::models::TransactionType;
use tracing::debug;

/// Suggest a category, returning the accepted prediction if any
pub async fn cmd_categorize(
    db: &Database,
    config: &Config,
    description: &str,
    income: bool,
    top: Option<usize>,
) -> Result<Option<CategoryPrediction>> {
    let kind = if income {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };

    // Prefer the user's own categories as the answer set
    let mut labels = db.list_categories()?;
    if labels.is_empty() {
        labels = config.categorization.default_labels.clone();
    }
    debug!(labels = labels.len(), "Classifier label set");

    let client = ClassifierClient::from_config(&config.classifier, labels);
    println!("🤖 Classifying with {}...", client.model());

    let gateway = CategorizationGateway::from_config(client, &config.categorization)
        .context("Invalid categorization config")?;

    let prediction = gateway.predict_with_confidence(description, kind).await;
    match &prediction {
        Some(p) => println!(
            "✅ {} ({:.0}% confidence)",
            p.category_name,
            p.confidence * 100.0
        ),
        None => println!(
            "❔ No confident suggestion (threshold {:.0}%)",
            gateway.min_confidence() * 100.0
        ),
    }

    let limit = top.unwrap_or(config.categorization.top_k);
    let alternatives = gateway.top_predictions(description, kind, limit).await;
    if !alternatives.is_empty() {
        println!("   Top {}:", alternatives.len());
        for alt in alternatives {
            println!(
                "     {:<18} {:>5.1}%",
                alt.category_name,
                alt.confidence * 100.0
            );
        }
    }

    Ok(prediction)
}
