use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_domain::{ReservationError, StoreError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::NotFound(what) => AppError::NotFoundError(format!("{what} not found")),
            ReservationError::Forbidden => AppError::AuthorizationError(err.to_string()),
            ReservationError::OutOfRange { .. }
            | ReservationError::SeatTaken(_)
            | ReservationError::AlreadyCancelled => AppError::ValidationError(err.to_string()),
            ReservationError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) | StoreError::SeatConflict => {
                AppError::ValidationError(err.to_string())
            }
            StoreError::Unavailable(msg) => AppError::InternalServerError(msg),
        }
    }
}
