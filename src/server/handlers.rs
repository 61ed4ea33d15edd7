// HTTP request handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use super::request::JsonBody;
use super::AppState;
use crate::errors::{StoreError, TrainingError};
use crate::models::{validate_model_name, ModelSummary, PRETRAINED_MODEL};
use crate::redaction::split_words;
use crate::training::DEFAULT_ITERATIONS;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/redact/", post(handle_redact))
        .route("/train/", get(handle_list_models).post(handle_train))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Response body for POST /redact/
#[derive(Debug, Serialize)]
pub struct RedactResponse {
    pub text: Vec<String>,
    #[serde(rename = "H0")]
    pub h0: serde_json::Value,
    #[serde(rename = "H1")]
    pub h1: serde_json::Value,
}

/// Handle POST /redact/ - Predict which words to redact
async fn handle_redact(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RedactResponse>, ApiError> {
    let body = JsonBody::parse(&body, "text")?;
    let text = body.required_str("text")?;
    let model_name = body.optional_str("modelName", PRETRAINED_MODEL)?;

    validate_model_name(&model_name)?;

    let words = split_words(&text);
    tracing::debug!(model = %model_name, words = words.len(), "Redaction request");

    let prediction = state.redaction().predict(&words, &model_name).await?;

    Ok(Json(RedactResponse {
        text: words,
        h0: prediction.h0,
        h1: prediction.h1,
    }))
}

/// Response body for GET /train/
#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelSummary>,
}

/// Handle GET /train/ - List models and their status
async fn handle_list_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelListResponse>, ApiError> {
    let models = state.store().list_models()?;
    Ok(Json(ModelListResponse { models }))
}

/// Handle POST /train/ - Start training a new model
async fn handle_train(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let body = JsonBody::parse(&body, "modelName")?;
    let model_name = body.required_str("modelName")?;
    let iterations = body.optional_positive_u32("iterations", DEFAULT_ITERATIONS)?;

    state
        .orchestrator()
        .start_training(&model_name, iterations)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub active_jobs: usize,
}

/// Handle GET /health - Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_jobs: state.orchestrator().scheduler().active_count(),
    })
}

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Body absent or not a JSON object (400, plain text)
    MissingBody(String),
    /// Client error reported as `{"error": ...}` (400)
    BadRequest(String),
    /// Anything else (500, plain text)
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn missing_key(key: &str) -> Self {
        Self::BadRequest(format!("Missing key in JSON body: '{}'", key))
    }

    pub fn invalid_value(key: &str, expected: &str) -> Self {
        Self::BadRequest(format!(
            "Invalid value for key '{}': expected {}",
            key, expected
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingBody(message) => {
                tracing::debug!(error = %message, "Rejected request");
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ApiError::BadRequest(message) => {
                tracing::debug!(error = %message, "Rejected request");
                let body = serde_json::json!({ "error": message });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Internal(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) | StoreError::InvalidName(_) => {
                Self::BadRequest(err.to_string())
            }
            StoreError::Io { .. } => Self::Internal(err.into()),
        }
    }
}

impl From<TrainingError> for ApiError {
    fn from(err: TrainingError) -> Self {
        match err {
            TrainingError::Store(e) => e.into(),
            TrainingError::Job(e) => Self::BadRequest(e.to_string()),
            TrainingError::InvalidIterations(_) => {
                Self::invalid_value("iterations", "positive integer")
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
