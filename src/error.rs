use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the inference service
#[derive(Error, Debug)]
pub enum ServeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    // Request validation errors
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // Model errors
    #[error("Model error: {0}")]
    Model(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ServeError
pub type Result<T> = std::result::Result<T, ServeError>;

/// Rejections raised while turning a request into model input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("`{field}` must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("expected {expected} features, got {got}")]
    Length { expected: usize, got: usize },

    #[error("feature `{field}` is not numeric: {value}")]
    NotNumeric { field: String, value: String },

    #[error("feature `{field}` has unknown category {value}")]
    UnknownCategory { field: String, value: String },

    #[error("unknown feature column `{0}`")]
    UnknownColumn(String),

    #[error("missing feature column `{0}`")]
    MissingColumn(String),

    #[error("model input dim mismatch: got {got}, expected {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("feature names do not match model: expected {expected:?}, got {got:?}")]
    FeatureNames {
        expected: Vec<String>,
        got: Vec<String>,
    },
}

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl ServeError {
    /// HTTP status and stable error kind for this failure
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ServeError::MalformedBody(_) | ServeError::Json(_) => {
                (StatusCode::BAD_REQUEST, "malformed_json")
            }
            ServeError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            ServeError::Model(_) => (StatusCode::INTERNAL_SERVER_ERROR, "model"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(kind, "request failed: {}", self);
        } else {
            tracing::debug!(kind, "request rejected: {}", self);
        }
        let body = ErrorBody {
            error: match &self {
                ServeError::Validation(e) => e.to_string(),
                other => other.to_string(),
            },
            kind,
        };
        (status, Json(body)).into_response()
    }
}
