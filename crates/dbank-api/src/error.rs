//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from dbank-state and dbank-core to HTTP status
//! codes and JSON error bodies with a machine-readable code, a message,
//! and (for validation failures) the full list of violated fields.
//! Internal error details are never exposed to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use dbank_core::Violations;
use dbank_state::StateError;

/// Structured JSON error response body.
///
/// All error responses use this format across the API surface. The
/// `details` field carries the violated-field list for validation
/// failures and is omitted otherwise.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "STATE_CONFLICT").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional detail, present only for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Entity absent or soft-deleted (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body or identifier could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// One or more field constraints violated (400). Carries every
    /// violated field, not just the first.
    #[error("validation failed: {0}")]
    Validation(Violations),

    /// Missing or unusable caller identity (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Role, ownership, or privileged-filter denial (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Mutation rejected by a terminal entity state — card blocked or
    /// expired, operation confirmed (403).
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// Internal server error (500). Message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::StateConflict(_) => (StatusCode::FORBIDDEN, "STATE_CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Not-found error for an entity kind and id.
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} {id} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if let Self::Internal(_) = &self {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match &self {
            Self::Validation(violations) => serde_json::to_value(&violations.0).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Terminal entity states all map to a 403 state conflict.
impl From<StateError> for AppError {
    fn from(err: StateError) -> Self {
        Self::StateConflict(err.to_string())
    }
}

impl From<Violations> for AppError {
    fn from(violations: Violations) -> Self {
        Self::Validation(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn not_found_status_code() {
        let err = AppError::not_found("account", Uuid::nil());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn validation_maps_to_400() {
        let mut violations = Violations::new();
        violations.push("label", "must not be blank");
        let err = AppError::Validation(violations);
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_FAILED");
    }

    #[test]
    fn state_conflict_maps_to_403() {
        let err = AppError::from(StateError::OperationConfirmed(Uuid::nil()));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "STATE_CONFLICT");
    }

    #[test]
    fn card_state_errors_map_to_403() {
        for err in [
            StateError::CardBlocked(Uuid::nil()),
            StateError::CardExpired(Uuid::nil()),
        ] {
            let (status, code) = AppError::from(err).status_and_code();
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(code, "STATE_CONFLICT");
        }
    }

    #[test]
    fn forbidden_and_unauthorized_codes() {
        assert_eq!(
            AppError::Forbidden("nope".into()).status_and_code(),
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        );
        assert_eq!(
            AppError::Unauthorized("who".into()).status_and_code(),
            (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
        );
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_not_found() {
        let (status, body) =
            response_parts(AppError::NotFound("card 123 not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "NOT_FOUND");
        assert!(body.error.message.contains("card 123"));
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn into_response_validation_lists_every_field() {
        let mut violations = Violations::new();
        violations.push("number", "must be exactly 16 digits");
        violations.push("code", "must be exactly 4 digits");
        let (status, body) = response_parts(AppError::Validation(violations)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "VALIDATION_FAILED");
        let details = body.error.details.expect("details present");
        let fields: Vec<&str> = details
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["number", "code"]);
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("db connection failed".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(
            !body.error.message.contains("db connection"),
            "internal error details must not leak: {}",
            body.error.message
        );
        assert_eq!(body.error.message, "An internal error occurred");
    }

    #[tokio::test]
    async fn into_response_state_conflict() {
        let (status, body) =
            response_parts(AppError::StateConflict("card x is blocked".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error.code, "STATE_CONFLICT");
        assert!(body.error.message.contains("blocked"));
    }
}
