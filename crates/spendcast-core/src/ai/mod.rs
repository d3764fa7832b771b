//! Pluggable text classification backends
//!
//! - `TextClassifier` trait: the interface the categorization gateway consumes
//! - `ClassifierClient` enum: Clone + compile-time dispatch over the backends
//! - Backends: `OllamaClassifier` (local LLM over HTTP), `MockClassifier`
//!
//! Environment variables (see `Config::apply_env` for the full list):
//! - `SPENDCAST_CLASSIFIER`: backend to use (ollama, mock)
//! - `OLLAMA_HOST`, `OLLAMA_MODEL`: Ollama server and model

mod mock;
mod ollama;
pub mod parsing;

pub use mock::{MockClassifier, FALLBACK_LABEL};
pub use ollama::{OllamaClassifier, DEFAULT_MODEL};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::error::Result;

/// Output of a classifier: the chosen label plus per-label probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub label_probabilities: HashMap<String, f64>,
}

impl Classification {
    /// Probability assigned to a label, 0 when absent
    pub fn probability(&self, label: &str) -> f64 {
        self.label_probabilities.get(label).copied().unwrap_or(0.0)
    }

    /// Probability of the chosen label
    pub fn top_probability(&self) -> f64 {
        self.probability(&self.label)
    }

    /// Labels by descending probability, ties broken alphabetically
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .label_probabilities
            .iter()
            .map(|(l, p)| (l.clone(), *p))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }
}

/// Maps a piece of text to a label
///
/// Implementations must not mutate anything observable, so a caller can drop
/// an in-flight call at any time.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification>;

    /// Whether the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;
}

/// Concrete classifier enum
#[derive(Clone)]
pub enum ClassifierClient {
    Ollama(OllamaClassifier),
    Mock(MockClassifier),
}

impl ClassifierClient {
    /// Build the configured backend, offering `labels` as the answer set
    pub fn from_config(config: &ClassifierConfig, labels: Vec<String>) -> Self {
        match config.backend {
            ClassifierBackend::Ollama => ClassifierClient::Ollama(
                OllamaClassifier::new(&config.host, &config.model)
                    .with_timeout(Duration::from_secs(config.timeout_secs))
                    .with_labels(labels),
            ),
            ClassifierBackend::Mock => ClassifierClient::Mock(MockClassifier::new()),
        }
    }
}

#[async_trait]
impl TextClassifier for ClassifierClient {
    async fn classify(&self, text: &str) -> Result<Classification> {
        match self {
            ClassifierClient::Ollama(c) => c.classify(text).await,
            ClassifierClient::Mock(c) => c.classify(text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ClassifierClient::Ollama(c) => c.health_check().await,
            ClassifierClient::Mock(c) => c.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ClassifierClient::Ollama(c) => c.model(),
            ClassifierClient::Mock(c) => c.model(),
        }
    }
}
