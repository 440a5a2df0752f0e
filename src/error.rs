//! Error handling for the case-management core
//!
//! A single `thiserror` taxonomy shared by the domain logic, services, and
//! HTTP gateway. Handlers never map errors by hand: `AppError` implements
//! `IntoResponse` and renders the `{success: false, message, error?}`
//! envelope every endpoint uses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Main error type for the case-management system
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Unknown case, ticket, or sub-document index (HTTP 404)
    #[error("{0}")]
    NotFound(String),

    /// Missing or unverifiable credentials (HTTP 401)
    #[error("{0}")]
    Unauthorized(String),

    /// Role or ownership check failed (HTTP 403)
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate unique field (HTTP 400, surfaces the existing case id)
    #[error("{message}")]
    Conflict {
        message: String,
        existing_case_id: Option<String>,
    },

    /// Disbursement verification string mismatch (HTTP 400). The message is
    /// deliberately vague so the stored reference is never leaked.
    #[error("{0}")]
    TransactionMismatch(String),

    /// A required external collaborator (blob store) failed (HTTP 502)
    #[error("{0}")]
    Dependency(String),

    /// Anything unexpected (HTTP 500); details are logged, not returned
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>, existing_case_id: Option<String>) -> Self {
        AppError::Conflict {
            message: msg.into(),
            existing_case_id,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            // Duplicate-submission contract: 400 with the existing id in the
            // payload, not an internal error.
            AppError::Conflict { .. } => StatusCode::BAD_REQUEST,
            AppError::TransactionMismatch(_) => StatusCode::BAD_REQUEST,
            AppError::Dependency(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate {
                field,
                existing_case_id,
            } => AppError::Conflict {
                message: format!("A record with this {field} already exists"),
                existing_case_id,
            },
            StoreError::NotFound => AppError::NotFound("Record not found".to_string()),
            StoreError::VersionConflict => AppError::Conflict {
                message: "The case was modified concurrently; please retry".to_string(),
                existing_case_id: None,
            },
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AppError::Conflict {
                message,
                existing_case_id: Some(case_id),
            } => json!({
                "success": false,
                "message": message,
                "existingCaseId": case_id,
            }),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                json!({
                    "success": false,
                    "message": "Internal server error",
                })
            }
            AppError::Dependency(msg) => {
                tracing::error!(error = %msg, "dependency failure");
                json!({
                    "success": false,
                    "message": self.to_string(),
                    "error": msg,
                })
            }
            other => json!({
                "success": false,
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for service and handler code
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_from_duplicate_carries_existing_case_id() {
        let err: AppError = StoreError::Duplicate {
            field: "FIR number".to_string(),
            existing_case_id: Some("DBT-2024-SOUTHDELHI-001".to_string()),
        }
        .into();

        match err {
            AppError::Conflict {
                existing_case_id, ..
            } => assert_eq!(
                existing_case_id.as_deref(),
                Some("DBT-2024-SOUTHDELHI-001")
            ),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::forbidden("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::TransactionMismatch("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
