use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::GenerationError;
use crate::features::FeatureKind;

/// JSON error body: `{ "error": ..., "details"?: ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details,
            },
        }
    }

    /// Map a pipeline failure to the feature's response.
    pub fn from_generation(kind: FeatureKind, err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(message) => {
                warn!("{}: rejected request: {}", kind, message);
                Self::new(StatusCode::BAD_REQUEST, message, None)
            }
            GenerationError::Upstream { status, details } => {
                error!("{}: upstream failure (status {:?}): {}", kind, status, details);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    kind.upstream_message(),
                    Some(details),
                )
            }
            GenerationError::Extraction(reason) => {
                error!("{}: extraction failed: {}", kind, reason);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    kind.extraction_message(),
                    None,
                )
            }
            GenerationError::Configuration(reason) => {
                error!("{}: configuration error: {}", kind, reason);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Missing API key",
                    Some(Value::String(reason)),
                )
            }
        }
    }

    pub fn invalid_body(kind: FeatureKind, rejection: JsonRejection) -> Self {
        warn!("{}: invalid request body: {}", kind, rejection.body_text());
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            Some(Value::String(rejection.body_text())),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
