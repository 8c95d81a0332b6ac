use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::booking::BookingStatus;
use crate::models::vehicle::VehicleType;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinate(String),

    #[error("{0} location is outside our service area")]
    OutOfServiceArea(String),

    #[error("trip too short: {0:.2} km is below the 0.5 km minimum")]
    TripTooShort(f64),

    #[error("trip too long: {0:.2} km exceeds the 100 km maximum")]
    TripTooLong(f64),

    #[error("pickup time must be at least 30 minutes from now")]
    PickupTimeTooSoon,

    #[error("pickup time cannot be more than 7 days in advance")]
    PickupTimeTooFarOut,

    #[error("unknown vehicle type: {0}")]
    UnknownVehicleType(VehicleType),

    #[error("driver account not approved")]
    DriverNotApproved,

    #[error("no active vehicles linked to this driver")]
    NoActiveVehicle,

    #[error("cannot accept job: driver status is {0}")]
    DriverNotAvailable(String),

    #[error("driver already has an active job")]
    DriverHasActiveJob,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job has already been accepted by another driver")]
    JobAlreadyTaken,

    #[error("job is no longer available, current status: {0}")]
    JobNotPending(BookingStatus),

    #[error("driver does not have required vehicle type: {0}")]
    VehicleTypeMismatch(VehicleType),

    #[error("cannot change status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("failed to generate a unique booking number after {0} attempts")]
    BookingNumberExhausted(u32),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid pricing config: {0}")]
    InvalidPricingConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidCoordinate(_)
            | AppError::OutOfServiceArea(_)
            | AppError::TripTooShort(_)
            | AppError::TripTooLong(_)
            | AppError::PickupTimeTooSoon
            | AppError::PickupTimeTooFarOut
            | AppError::UnknownVehicleType(_)
            | AppError::BadRequest(_)
            | AppError::InvalidPricingConfig(_) => StatusCode::BAD_REQUEST,

            AppError::DriverNotApproved
            | AppError::NoActiveVehicle
            | AppError::DriverNotAvailable(_) => StatusCode::FORBIDDEN,

            AppError::DriverHasActiveJob
            | AppError::JobAlreadyTaken
            | AppError::JobNotPending(_)
            | AppError::VehicleTypeMismatch(_)
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,

            AppError::JobNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            AppError::BookingNumberExhausted(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
