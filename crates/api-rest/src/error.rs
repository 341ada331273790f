//! API error type with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opd_core::ClinicError;
use serde::Serialize;

/// Body of every error response: `{ "error": { "code", "message" } }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::Clinic(e) => match e {
                ClinicError::Unauthorized { .. } => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                e if e.is_not_found() => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                ClinicError::VisitPatientMismatch { .. } => {
                    (StatusCode::CONFLICT, "VISIT_PATIENT_MISMATCH", e.to_string())
                }
                ClinicError::FollowUpTransition { .. } => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION", e.to_string())
                }
                ClinicError::InvalidInput(_) | ClinicError::Text(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", e.to_string())
                }
                _ => {
                    tracing::error!(error = %e, "API internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}
