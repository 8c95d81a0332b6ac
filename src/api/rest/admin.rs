use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post, put};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::lifecycle;
use crate::engine::pricing::PricingConfig;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::Driver;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/drivers/:id/approval", patch(set_driver_approval))
        .route("/admin/bookings/:id/status", patch(override_booking_status))
        .route("/admin/pricing-config", put(replace_pricing_config))
        .route("/admin/pricing-config/reset", post(reset_pricing_config))
}

#[derive(Deserialize)]
pub struct SetApprovalRequest {
    pub is_approved: bool,
}

async fn set_driver_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetApprovalRequest>,
) -> Result<Json<Driver>, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    driver.is_approved = payload.is_approved;
    driver.updated_at = Utc::now();

    info!(driver_id = %id, approved = payload.is_approved, "driver approval changed");
    Ok(Json(driver.clone()))
}

#[derive(Deserialize)]
pub struct OverrideStatusRequest {
    pub status: BookingStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn override_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OverrideStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = lifecycle::force_status(&state, id, payload.status, payload.reason)?;
    Ok(Json(booking))
}

async fn replace_pricing_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<PricingConfig>,
) -> Result<Json<PricingConfig>, AppError> {
    config.validate()?;
    state.swap_pricing_config(config);

    info!("pricing configuration replaced");
    Ok(Json(state.pricing_config()))
}

async fn reset_pricing_config(State(state): State<Arc<AppState>>) -> Json<PricingConfig> {
    state.swap_pricing_config(PricingConfig::default());

    info!("pricing configuration reset to defaults");
    Json(state.pricing_config())
}
