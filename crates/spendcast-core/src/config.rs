//! Configuration
//!
//! ## Resolution
//!
//! 1. An explicit path (`--config`), which must exist
//! 2. Override in the data dir (~/.local/share/spendcast/config.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Environment variables are applied on top of whichever file won.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/spendcast.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct CategorizationConfig {
    /// Minimum probability for a top label to be accepted, in [0, 1]
    pub min_confidence: f64,
    pub top_k: usize,
    /// Labels offered to the classifier when no categories exist yet
    pub default_labels: Vec<String>,
}

impl Default for CategorizationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            top_k: 3,
            default_labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    Ollama,
    Mock,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(Error::InvalidData(format!(
                "Unknown classifier backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    pub host: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Ollama,
            host: "http://localhost:11434".to_string(),
            model: crate::ai::DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastConfig {
    /// Linear model artifact for the model-backed tier
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub categorization: CategorizationConfig,
    pub classifier: ClassifierConfig,
    pub forecast: ForecastConfig,
}

impl Config {
    /// Load config and apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let content = match explicit {
            Some(path) => read_config(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => read_config(&path)?,
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        let mut config = parse_config(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// The embedded defaults, without environment overrides
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }

    /// Apply overrides from a variable lookup
    ///
    /// - `SPENDCAST_CLASSIFIER`: classifier backend
    /// - `OLLAMA_HOST`, `OLLAMA_MODEL`: Ollama server and model
    /// - `SPENDCAST_MODEL_PATH`: forecast model artifact
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("SPENDCAST_CLASSIFIER") {
            self.classifier.backend = backend.parse()?;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.classifier.host = host;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.classifier.model = model;
        }
        if let Some(path) = lookup("SPENDCAST_MODEL_PATH").filter(|p| !p.is_empty()) {
            self.forecast.model_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

/// Override location in the platform data dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendcast").join("config.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "Reading config");
    fs::read_to_string(path).map_err(|e| {
        Error::InvalidData(format!("Failed to read config {}: {}", path.display(), e))
    })
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    categorization: Option<RawCategorization>,
    classifier: Option<RawClassifier>,
    forecast: Option<RawForecast>,
}

#[derive(Debug, Deserialize)]
struct RawCategorization {
    min_confidence: Option<f64>,
    top_k: Option<usize>,
    default_labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawClassifier {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    model_path: Option<PathBuf>,
}

fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(cat) = raw.categorization {
        if let Some(threshold) = cat.min_confidence {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::InvalidData(format!(
                    "categorization.min_confidence must be within [0, 1], got {}",
                    threshold
                )));
            }
            config.categorization.min_confidence = threshold;
        }
        if let Some(top_k) = cat.top_k {
            config.categorization.top_k = top_k;
        }
        if let Some(labels) = cat.default_labels {
            config.categorization.default_labels = labels;
        }
    }

    if let Some(classifier) = raw.classifier {
        if let Some(backend) = classifier.backend {
            config.classifier.backend = backend.parse()?;
        }
        if let Some(host) = classifier.host {
            config.classifier.host = host;
        }
        if let Some(model) = classifier.model {
            config.classifier.model = model;
        }
        if let Some(timeout) = classifier.timeout_secs {
            config.classifier.timeout_secs = timeout;
        }
    }

    if let Some(forecast) = raw.forecast {
        config.forecast.model_path = forecast.model_path;
    }

    Ok(config)
}
