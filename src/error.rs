//! Error taxonomy for a single generation request.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Required input missing or blank. Never reaches the oracle.
    #[error("{0}")]
    Validation(String),

    /// The oracle call failed or answered with a non-success status.
    #[error("upstream oracle error (status {status:?}): {details}")]
    Upstream {
        status: Option<u16>,
        details: Value,
    },

    /// The oracle answered, but no structured payload survived every extraction tier.
    #[error("no structured payload could be extracted: {0}")]
    Extraction(String),

    /// Missing API credential. Fatal for the invocation, not retryable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GenerationError {
    pub fn upstream(status: Option<u16>, body: &str) -> Self {
        let details = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.into()));
        Self::Upstream { status, details }
    }
}
