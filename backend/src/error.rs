use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Field name -> list of human-readable messages, mirroring the wire shape
/// clients already parse for 400 responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or out-of-range input. Serialized as the field map itself.
    #[error("validation failed")]
    Validation(FieldErrors),
    /// Bad credentials or a missing/expired token.
    #[error("{0}")]
    Authentication(String),
    /// Missing resource. Access to another user's records also surfaces as
    /// not-found, never as a distinct forbidden signal.
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Single-field validation error.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(fields)
    }
}

/// Accumulates range-check failures so a response can enumerate every
/// offending field at once.
#[derive(Debug, Default)]
pub struct FieldValidator {
    errors: FieldErrors,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range_int(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.push(field, format!("Ensure this value is between {} and {}.", min, max));
        }
    }

    pub fn range_float(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.push(field, format!("Ensure this value is between {} and {}.", min, max));
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Fails with every collected violation; nothing should persist when
    /// this returns Err.
    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(fields) => {
                (StatusCode::BAD_REQUEST, Json(fields)).into_response()
            }
            AppError::Authentication(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": message })),
            )
                .into_response(),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": message })),
            )
                .into_response(),
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
            AppError::Internal(e) => {
                error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_collects_all_offending_fields() {
        let mut v = FieldValidator::new();
        v.range_int("heart_rate", 300, 40, 200);
        v.range_float("temperature", 90.0, 95.0, 105.0);
        v.range_int("oxygen_saturation", 95, 80, 100);

        match v.finish() {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields.len(), 2);
                assert!(fields.contains_key("heart_rate"));
                assert!(fields.contains_key("temperature"));
                assert!(!fields.contains_key("oxygen_saturation"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn validator_passes_in_range_values() {
        let mut v = FieldValidator::new();
        v.range_int("stress_level", 5, 1, 10);
        v.range_float("sleep_hours", 8.0, 0.0, 24.0);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut v = FieldValidator::new();
        v.range_int("heart_rate", 40, 40, 200);
        v.range_int("heart_rate", 200, 40, 200);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let mut v = FieldValidator::new();
        v.range_float("temperature", f64::NAN, 95.0, 105.0);
        assert!(v.finish().is_err());
    }
}
