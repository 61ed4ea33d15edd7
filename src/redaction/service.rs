// Redaction service
// Thin wrapper over the external predictor

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Output of the external predictor
///
/// Both hypotheses are passed through to clients untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "H0")]
    pub h0: serde_json::Value,
    #[serde(rename = "H1")]
    pub h1: serde_json::Value,
}

/// External prediction collaborator
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Predict redaction labels for `words` using the named model
    async fn predict(&self, words: &[String], model_name: &str) -> Result<Prediction>;
}

/// Stateless redaction entry point used by the HTTP layer
#[derive(Clone)]
pub struct RedactionService {
    predictor: Arc<dyn Predictor>,
}

impl RedactionService {
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        Self { predictor }
    }

    /// Delegate to the predictor; errors are returned unchanged
    pub async fn predict(&self, words: &[String], model_name: &str) -> Result<Prediction> {
        self.predictor.predict(words, model_name).await
    }
}

/// Split text into words on the literal space character
///
/// Consecutive spaces produce empty words, matching what the predictor
/// was trained against.
pub fn split_words(text: &str) -> Vec<String> {
    text.split(' ').map(str::to_owned).collect()
}
