//! Mock classifier for testing
//!
//! Deterministic stand-in for a trained model. Useful for unit tests and for
//! running the CLI without an Ollama server.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::{Classification, TextClassifier};

/// Keyword -> label rules used by the default mode
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (
        &["grocer", "whole foods", "trader joe", "safeway", "kroger"],
        "Groceries",
    ),
    (
        &["restaurant", "starbucks", "cafe", "mcdonald", "pizza"],
        "Dining",
    ),
    (&["netflix", "spotify", "hulu", "subscription"], "Subscriptions"),
    (&["uber", "lyft", "shell", "chevron", "fuel", "gas"], "Transport"),
    (&["rent", "landlord", "mortgage"], "Housing"),
    (&["electric", "water bill", "internet", "utility"], "Utilities"),
    (&["payroll", "salary", "paycheck", "direct dep"], "Salary"),
];

/// Label used when no keyword matches
pub const FALLBACK_LABEL: &str = "Other";

#[derive(Clone, Debug)]
enum Mode {
    Keywords,
    Fixed(Classification),
    Failing(String),
}

/// Mock text classifier
#[derive(Clone, Debug)]
pub struct MockClassifier {
    mode: Mode,
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClassifier {
    /// Keyword-matching classifier
    ///
    /// A single matching rule scores 0.9; several matches split the mass
    /// evenly; no match yields `Other` at 0.4.
    pub fn new() -> Self {
        Self {
            mode: Mode::Keywords,
        }
    }

    /// Always return the same classification
    pub fn fixed(label: &str, probabilities: &[(&str, f64)]) -> Self {
        Self {
            mode: Mode::Fixed(Classification {
                label: label.to_string(),
                label_probabilities: probabilities
                    .iter()
                    .map(|(l, p)| (l.to_string(), *p))
                    .collect(),
            }),
        }
    }

    /// Fail every call
    pub fn failing(message: &str) -> Self {
        Self {
            mode: Mode::Failing(message.to_string()),
        }
    }

    fn keyword_classification(text: &str) -> Classification {
        let text = text.to_lowercase();
        let matched: Vec<&str> = KEYWORD_RULES
            .iter()
            .filter(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
            .map(|(_, label)| *label)
            .collect();

        let mut label_probabilities = HashMap::new();
        let label = match matched.as_slice() {
            [] => {
                label_probabilities.insert(FALLBACK_LABEL.to_string(), 0.4);
                FALLBACK_LABEL
            }
            [only] => {
                label_probabilities.insert(only.to_string(), 0.9);
                label_probabilities.insert(FALLBACK_LABEL.to_string(), 0.1);
                *only
            }
            many => {
                let share = 1.0 / many.len() as f64;
                for label in many {
                    label_probabilities.insert(label.to_string(), share);
                }
                many[0]
            }
        };

        Classification {
            label: label.to_string(),
            label_probabilities,
        }
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        match &self.mode {
            Mode::Keywords => Ok(Self::keyword_classification(text)),
            Mode::Fixed(c) => Ok(c.clone()),
            Mode::Failing(message) => Err(Error::Classification(message.clone())),
        }
    }

    async fn health_check(&self) -> bool {
        !matches!(self.mode, Mode::Failing(_))
    }

    fn model(&self) -> &str {
        "mock"
    }
}
