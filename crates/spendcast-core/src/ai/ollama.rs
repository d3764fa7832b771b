//! Ollama classifier
//!
//! Sends the transaction text and the candidate labels to `/api/generate` and
//! parses the JSON object the model replies with.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::parsing::parse_classification;
use super::{Classification, TextClassifier};

pub const DEFAULT_MODEL: &str = "llama3.2";

/// Classifier backed by a local Ollama server
#[derive(Clone)]
pub struct OllamaClassifier {
    http_client: Client,
    base_url: String,
    model: String,
    labels: Vec<String>,
}

impl OllamaClassifier {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            labels: Vec::new(),
        }
    }

    /// Apply a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    /// Restrict answers to these labels
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn build_prompt(&self, text: &str) -> String {
        let choices = if self.labels.is_empty() {
            "Choose the most fitting personal-finance category.".to_string()
        } else {
            format!("Categories: {}", self.labels.join(", "))
        };

        format!(
            "Classify this bank transaction into exactly one category.\n\
             {}\n\
             Transaction: \"{}\"\n\
             Respond with JSON only, probabilities between 0 and 1:\n\
             {{\"label\": \"<category>\", \"probabilities\": {{\"<category>\": <probability>}}}}",
            choices, text
        )
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl TextClassifier for OllamaClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        let request = OllamaRequest {
            model: &self.model,
            prompt: self.build_prompt(text),
            stream: false,
            format: "json",
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let ollama_response: OllamaResponse = response.json().await?;
        debug!(model = %self.model, "Ollama classify response: {}", ollama_response.response);

        parse_classification(&ollama_response.response)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                debug!(host = %self.base_url, error = %e, "Ollama health check failed");
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
