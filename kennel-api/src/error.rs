use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kennel_capacity::CapacityError;
use kennel_core::{StoreError, TokenError};
use kennel_reservation::ReservationError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    AuthenticationError(String),
    NotFoundError(String),
    ConflictError(String),
    CapacityExceededError { spots_available: u32 },
    PaymentDeclinedError(String),
    ServiceUnavailable(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": msg }))
            }
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::CapacityExceededError { spots_available } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "No capacity for the requested dates",
                    "spots_available": spots_available,
                }),
            ),
            AppError::PaymentDeclinedError(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Payment was declined", "details": msg }),
            ),
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Service temporarily unavailable" }),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InvalidRange(e) => AppError::ValidationError(e.to_string()),
            ReservationError::Validation(msg) => AppError::ValidationError(msg),
            ReservationError::NotFound(id) => {
                AppError::NotFoundError(format!("Booking not found: {id}"))
            }
            ReservationError::Transition(e) => AppError::ConflictError(e.to_string()),
            ReservationError::CapacityExceeded { spots_available } => {
                AppError::CapacityExceededError { spots_available }
            }
            ReservationError::PaymentDeclined(msg) => AppError::PaymentDeclinedError(msg),
            ReservationError::Transient(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl From<CapacityError> for AppError {
    fn from(err: CapacityError) -> Self {
        match err {
            CapacityError::InvalidRange(e) => AppError::ValidationError(e.to_string()),
            CapacityError::InvalidQuantity => {
                AppError::ValidationError("quantity must be at least 1".to_string())
            }
            CapacityError::InvalidMonth(m) => {
                AppError::ValidationError(format!("Invalid month: {m}"))
            }
            CapacityError::CapacityExceeded { spots_available } => {
                AppError::CapacityExceededError { spots_available }
            }
            CapacityError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded { spots_available } => {
                AppError::CapacityExceededError { spots_available }
            }
            StoreError::NotFound(what) => AppError::NotFoundError(what),
            StoreError::Transient(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::AuthenticationError("Invalid or expired cancellation token".to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}
