//! Request-terminating error types for the ingestion API.
//!
//! Each variant carries its exact wire message as the `Display` string
//! and maps to a fixed HTTP status. Devices in the field parse these
//! bodies, so message text is part of the contract and must not drift.
//!
//! Dedupe-lookup failures have no variant here: the lookup is
//! best-effort and never terminates a request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors that terminate a sale ingestion request.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Request used a method other than POST.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Shared secret missing or mismatched.
    #[error("Unauthorized")]
    Unauthorized,

    /// Body present but not parseable as JSON.
    #[error("Invalid JSON body")]
    InvalidJson,

    /// A required payload field is absent or empty.
    #[error("Missing required fields: vendo, amount, txn")]
    MissingFields,

    /// Insert failed for a reason other than a duplicate key.
    #[error("DB insert failed")]
    WriteFailed {
        /// Driver-level failure description, forwarded to the caller.
        detail: String,
    },

    /// Unexpected failure. No internal detail crosses the wire.
    #[error("Internal server error")]
    Internal,
}

impl IngestError {
    /// Returns the HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidJson | Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::WriteFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape for error responses.
///
/// `detail` only appears on upstream write failures; every other error
/// carries the bare message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Fixed error message.
    pub error: String,

    /// Driver detail, present on 502 responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// Builds a bare error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), detail: None }
    }

    /// Builds an error body with driver detail attached.
    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { error: error.into(), detail: Some(detail.into()) }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::WriteFailed { detail } => {
                ErrorBody::with_detail(self.to_string(), detail.clone())
            },
            _ => ErrorBody::new(self.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_wire_contract() {
        assert_eq!(IngestError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(IngestError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(IngestError::InvalidJson.status(), StatusCode::BAD_REQUEST);
        assert_eq!(IngestError::MissingFields.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            IngestError::WriteFailed { detail: "timeout".to_string() }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(IngestError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_match_wire_contract() {
        assert_eq!(IngestError::MethodNotAllowed.to_string(), "Method not allowed");
        assert_eq!(IngestError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(IngestError::InvalidJson.to_string(), "Invalid JSON body");
        assert_eq!(
            IngestError::MissingFields.to_string(),
            "Missing required fields: vendo, amount, txn"
        );
        assert_eq!(
            IngestError::WriteFailed { detail: "timeout".to_string() }.to_string(),
            "DB insert failed"
        );
        assert_eq!(IngestError::Internal.to_string(), "Internal server error");
    }

    #[test]
    fn bare_body_omits_detail_field() {
        let value = serde_json::to_value(ErrorBody::new("Unauthorized")).unwrap();
        assert_eq!(value, serde_json::json!({"error": "Unauthorized"}));
    }

    #[test]
    fn detail_body_includes_detail_field() {
        let value =
            serde_json::to_value(ErrorBody::with_detail("DB insert failed", "timeout")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": "DB insert failed", "detail": "timeout"})
        );
    }
}
