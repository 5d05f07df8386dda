use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stockroom_core::record::ValidationError;
use stockroom_core::service::UpsertError;
use stockroom_core::storage::{repository_error_to_status_code, RepositoryError};

/// Handler error rendered as `{"error": ...}`.
///
/// Repository errors map to their status codes, validation errors to 400.
/// A batch with failed items renders its outputs next to the generic message.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(UpsertError::ItemsFailed { outputs, .. }) = self.0.downcast_ref::<UpsertError>() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": self.0.to_string(), "outputs": outputs })),
            )
                .into_response();
        }

        let status_code = if let Some(repo_error) = self.0.downcast_ref::<RepositoryError>() {
            let code = repository_error_to_status_code(repo_error);
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        } else if self.0.downcast_ref::<ValidationError>().is_some() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status_code, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
