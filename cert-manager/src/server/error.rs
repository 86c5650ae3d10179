use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::error::LifecycleError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ServerError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let Self::Lifecycle(err) = self;
        if err.is_not_found() {
            (StatusCode::NOT_FOUND, "Not found".to_string())
        } else if matches!(err, LifecycleError::DuplicateAccount { .. }) {
            (StatusCode::CONFLICT, "Account was created concurrently, retry".to_string())
        } else if err.is_client_error() {
            (StatusCode::BAD_REQUEST, err.to_string())
        } else {
            log::error!("Request failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}
