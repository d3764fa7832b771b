//! Test utilities for spendcast-core
//!
//! A mock Ollama server that answers classification prompts, for development
//! and integration tests without a real model.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::ai::{MockClassifier, TextClassifier};

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

/// Canned reply, or None to answer with keyword classification
type Reply = Arc<Option<String>>;

impl MockOllamaServer {
    /// Start the mock server on an available port
    ///
    /// Generate requests are classified with the keyword rules of
    /// [`MockClassifier`].
    pub async fn start() -> Self {
        Self::spawn(Arc::new(None)).await
    }

    /// Start a server that answers every generate request with `reply`
    pub async fn with_reply(reply: &str) -> Self {
        Self::spawn(Arc::new(Some(reply.to_string()))).await
    }

    async fn spawn(reply: Reply) -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .with_state(reply);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 4_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(
    State(reply): State<Reply>,
    Json(request): Json<GenerateRequest>,
) -> Json<GenerateResponse> {
    let response = match &*reply {
        Some(canned) => canned.clone(),
        None => {
            let text = extract_transaction(&request.prompt);
            match MockClassifier::new().classify(&text).await {
                Ok(c) => serde_json::json!({
                    "label": c.label,
                    "probabilities": c.label_probabilities,
                })
                .to_string(),
                Err(_) => String::new(),
            }
        }
    };

    Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    })
}

/// Pull the quoted transaction out of the classification prompt
fn extract_transaction(prompt: &str) -> String {
    const MARKER: &str = "Transaction: \"";
    if let Some(start) = prompt.find(MARKER) {
        let rest = &prompt[start + MARKER.len()..];
        if let Some(end) = rest.find('"') {
            return rest[..end].to_string();
        }
    }
    prompt.to_string()
}

// Request/Response types for the mock server

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[allow(dead_code)]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}
