use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::assignment::AssignmentError;
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Assignment(AssignmentError::InvalidDriver) => {
                (StatusCode::BAD_REQUEST, "Invalid delivery person".to_string())
            }
            ApiError::Assignment(AssignmentError::NoDriversAvailable) => (
                StatusCode::BAD_REQUEST,
                "No delivery personnel available".to_string(),
            ),
            ApiError::Assignment(AssignmentError::Database(e)) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
