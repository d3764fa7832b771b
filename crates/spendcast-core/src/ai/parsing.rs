//! JSON parsing helpers for classifier responses
//!
//! Language models tend to wrap their JSON in prose or code fences, so the
//! object between the first `{` and the last `}` is what gets parsed.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};

use super::Classification;

const RAW_PREVIEW_LEN: usize = 200;

/// Reply shape requested from the model
#[derive(Debug, Deserialize)]
struct RawClassification {
    label: String,
    #[serde(default)]
    probabilities: HashMap<String, f64>,
    /// Some models only report a single score for the chosen label
    #[serde(default)]
    confidence: Option<f64>,
}

fn preview(s: &str) -> String {
    if s.len() > RAW_PREVIEW_LEN {
        let mut end = RAW_PREVIEW_LEN;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}

/// Slice out the JSON object embedded in a model response
pub fn extract_json(response: &str) -> Result<&str> {
    let response = response.trim();
    match (response.find('{'), response.rfind('}')) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::Classification(format!(
            "No JSON found in classifier response | Raw: {}",
            preview(response)
        ))),
    }
}

/// Parse a classification reply
///
/// Probabilities are clamped to [0, 1] and non-finite ones dropped. A bare
/// `confidence` is used as the chosen label's probability when the map does
/// not already carry it.
pub fn parse_classification(response: &str) -> Result<Classification> {
    let json_str = extract_json(response)?;
    let raw: RawClassification = serde_json::from_str(json_str).map_err(|e| {
        Error::Classification(format!(
            "Invalid JSON from classifier: {} | Raw: {}",
            e,
            preview(json_str)
        ))
    })?;

    let label = raw.label.trim().to_string();
    if label.is_empty() {
        return Err(Error::Classification("Classifier returned an empty label".into()));
    }

    let mut label_probabilities: HashMap<String, f64> = raw
        .probabilities
        .into_iter()
        .filter(|(_, p)| p.is_finite())
        .map(|(l, p)| (l.trim().to_string(), p.clamp(0.0, 1.0)))
        .collect();

    if let Some(confidence) = raw.confidence.filter(|c| c.is_finite()) {
        label_probabilities
            .entry(label.clone())
            .or_insert_with(|| confidence.clamp(0.0, 1.0));
    }

    if label_probabilities.is_empty() {
        return Err(Error::Classification(format!(
            "Classifier gave no probability for '{}'",
            label
        )));
    }

    Ok(Classification {
        label,
        label_probabilities,
    })
}
