use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One field-level problem found while validating provider output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// Dotted path to the offending field, e.g. `recommended_fertilizer.type`.
    pub path: String,
    pub reason: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Error taxonomy for the analysis pipeline and the photo routes.
///
/// Every variant maps to exactly one HTTP status; handlers return `ApiError`
/// and never let an error cross the boundary unconverted.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("Image too large (max {max_bytes} bytes)")]
    PayloadTooLarge { max_bytes: usize },

    #[error("{0}")]
    NotFound(String),

    /// Transport/timeout failure talking to the model provider. Not retried
    /// internally; callers may re-issue the whole request.
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider answered, but the text was not JSON. Carries the cleaned raw
    /// text for diagnostics.
    #[error("Model returned non-JSON")]
    MalformedProviderResponse { raw_text: String },

    /// Provider returned JSON that violates the diagnosis schema. Carries the
    /// full issue list so callers can correct everything in one round trip.
    #[error("Schema validation failed")]
    SchemaValidation { issues: Vec<Issue> },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            ApiError::UnsupportedMediaType(msg) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, json!({ "error": msg }))
            }
            ApiError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": self.to_string() }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::ProviderUnavailable(msg) => {
                tracing::error!("Provider unavailable: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Analysis failed", "details": msg }),
                )
            }
            ApiError::MalformedProviderResponse { raw_text } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Model returned non-JSON", "raw_text": raw_text }),
            ),
            ApiError::SchemaValidation { issues } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Schema validation failed", "issues": issues }),
            ),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
