use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::{InvalidTransition, InvariantViolation, ScheduleError};
use crate::services::payment::PaymentError;
use crate::services::reservation::ReservationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    #[error("service {0} is not offered by this shop")]
    InvalidService(String),

    #[error("that slot was just taken, please pick another time")]
    SlotConflict,

    #[error("that slot is no longer offered, please pick another time")]
    StaleSlot,

    #[error("{0}")]
    Conflict(String),

    #[error("payment could not be verified, contact support")]
    SignatureMismatch,

    #[error("payment gateway unavailable, please try again")]
    GatewayUnavailable,

    #[error("{0}")]
    InvariantViolation(#[from] InvariantViolation),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::Validation(_) => "validation",
            AppError::InvalidSchedule(_) => "invalid_schedule",
            AppError::InvalidService(_) => "invalid_service",
            AppError::SlotConflict => "slot_conflict",
            AppError::StaleSlot => "stale_slot",
            AppError::Conflict(_) => "conflict",
            AppError::SignatureMismatch => "signature_mismatch",
            AppError::GatewayUnavailable => "gateway_unavailable",
            AppError::InvariantViolation(_) => "invariant_violation",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
        }
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(msg) => AppError::Validation(msg),
            ReservationError::InvalidService(id) => AppError::InvalidService(id),
            ReservationError::SlotConflict => AppError::SlotConflict,
            ReservationError::StaleSlot => AppError::StaleSlot,
            ReservationError::Store(e) => AppError::Internal(e),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(msg) => AppError::Validation(msg),
            PaymentError::NotFound(what) => AppError::NotFound(what),
            PaymentError::SignatureMismatch => AppError::SignatureMismatch,
            PaymentError::GatewayUnavailable(_) => AppError::GatewayUnavailable,
            PaymentError::InvariantViolation(e) => AppError::InvariantViolation(e),
            PaymentError::Store(e) => AppError::Internal(e),
            other @ (PaymentError::AlreadyPaid
            | PaymentError::BookingCancelled
            | PaymentError::BookingChanged
            | PaymentError::OrderAbandoned
            | PaymentError::OrderAlreadyConsumed) => AppError::Conflict(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidSchedule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidService(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SlotConflict => StatusCode::CONFLICT,
            AppError::StaleSlot => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::SignatureMismatch => StatusCode::BAD_REQUEST,
            AppError::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (status, axum::Json(body)).into_response()
    }
}
