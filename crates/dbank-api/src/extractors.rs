//! Request body extraction helpers.
//!
//! Handlers accept `Result<Json<T>, JsonRejection>` so a malformed body
//! becomes a structured 400 instead of axum's default plain-text reply,
//! and run the input validator before the payload reaches any domain
//! logic. Validators report every violated field at once.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use dbank_core::Violations;

use crate::error::AppError;

/// Implemented by every full input type. Runs all field checks and
/// returns the complete violation set.
pub trait Validate {
    fn validate(&self) -> Result<(), Violations>;
}

/// Deserialize and validate a full request body.
pub fn extract_validated_json<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(payload)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Deserialize a request body without input-level validation. Used by
/// the PATCH handlers, which validate the merged result instead of the
/// partial delta.
pub fn extract_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let Json(value) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    Ok(value)
}
