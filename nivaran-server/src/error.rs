use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use nivaran_core::error::EngineError;

/// Wire shape for every error response.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Newtype so `EngineError` can cross the axum boundary with the normative
/// status mapping.
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            EngineError::InvalidTransition { .. } => (StatusCode::BAD_REQUEST, "invalid_transition"),
            EngineError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation"),
            EngineError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "unauthorized"),
            EngineError::OwnershipRequired { .. } => (StatusCode::FORBIDDEN, "ownership_required"),
            EngineError::DepartmentMismatch { .. } => {
                (StatusCode::FORBIDDEN, "department_mismatch")
            }
            EngineError::PreconditionFailed(_) => (StatusCode::FORBIDDEN, "precondition_failed"),
            EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            EngineError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            EngineError::ExternalUnavailable { .. } => {
                (StatusCode::BAD_GATEWAY, "external_unavailable")
            }
            EngineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: kind,
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Shorthand for handler signatures.
pub type ApiResult<T> = Result<T, ApiError>;
