//! Categorization gateway
//!
//! Thin adapter over a [`TextClassifier`]: composes the classifier input,
//! applies the acceptance threshold and ranks alternatives. Classifier
//! failures never escape; they read as "no suggestion".

use serde::Serialize;
use tracing::{debug, warn};

use crate::ai::{Classification, TextClassifier};
use crate::config::CategorizationConfig;
use crate::error::{Error, Result};
use crate::models::TransactionType;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// A suggested category with its probability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPrediction {
    pub category_name: String,
    pub confidence: f64,
}

/// Classifier input for a transaction: `"{type}: {description}"`
///
/// Returns None for an empty or whitespace-only description. Trained models
/// expect exactly this shape.
pub fn compose_input(description: &str, kind: TransactionType) -> Option<String> {
    let description = description.trim();
    if description.is_empty() {
        return None;
    }
    Some(format!("{}: {}", kind.as_str(), description))
}

pub struct CategorizationGateway<C> {
    classifier: C,
    min_confidence: f64,
}

impl<C: TextClassifier> CategorizationGateway<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn from_config(classifier: C, config: &CategorizationConfig) -> Result<Self> {
        Self::new(classifier).with_min_confidence(config.min_confidence)
    }

    /// Set the acceptance threshold, which must lie in [0, 1]
    pub fn with_min_confidence(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidData(format!(
                "Minimum confidence must be within [0, 1], got {}",
                threshold
            )));
        }
        self.min_confidence = threshold;
        Ok(self)
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Best category name, if confident enough
    pub async fn predict(&self, description: &str, kind: TransactionType) -> Option<String> {
        self.predict_with_confidence(description, kind)
            .await
            .map(|p| p.category_name)
    }

    /// Best category with its probability
    ///
    /// None when the description is blank, the classifier fails, or the top
    /// label scores strictly below the threshold.
    pub async fn predict_with_confidence(
        &self,
        description: &str,
        kind: TransactionType,
    ) -> Option<CategoryPrediction> {
        let classification = self.classify(description, kind).await?;
        let confidence = classification.top_probability();

        // Written as !(>=) so NaN is rejected too
        if !(confidence >= self.min_confidence) {
            debug!(
                label = %classification.label,
                confidence,
                threshold = self.min_confidence,
                "Top label below threshold"
            );
            return None;
        }

        Some(CategoryPrediction {
            category_name: classification.label,
            confidence,
        })
    }

    /// Up to `limit` labels by descending probability, unfiltered by threshold
    pub async fn top_predictions(
        &self,
        description: &str,
        kind: TransactionType,
        limit: usize,
    ) -> Vec<CategoryPrediction> {
        if limit == 0 {
            return Vec::new();
        }

        match self.classify(description, kind).await {
            Some(classification) => classification
                .ranked()
                .into_iter()
                .take(limit)
                .map(|(category_name, confidence)| CategoryPrediction {
                    category_name,
                    confidence,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    async fn classify(&self, description: &str, kind: TransactionType) -> Option<Classification> {
        let input = compose_input(description, kind)?;
        match self.classifier.classify(&input).await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(model = self.classifier.model(), error = %e, "Classification failed");
                None
            }
        }
    }
}
