use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::booking::{
    self, BookingPage, CreateBookingParams, CreatedBooking,
};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::booking::{Booking, BookingStatus, LoadType};
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
}

fn default_limit() -> usize {
    20
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub dropoff: GeoPoint,
    pub dropoff_address: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub vehicle_type_required: VehicleType,
    pub load_type: LoadType,
    #[serde(default)]
    pub load_description: Option<String>,
    #[serde(default)]
    pub estimated_weight_kg: Option<f64>,
    #[serde(default)]
    pub requires_helpers: bool,
    #[serde(default)]
    pub helpers_count: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<CreatedBooking>, AppError> {
    let pickup_at = super::parse_pickup_at(&payload.pickup_date, &payload.pickup_time)?;

    let created = booking::create_booking(&state, CreateBookingParams {
        customer_id: payload.customer_id,
        pickup: payload.pickup,
        pickup_address: payload.pickup_address,
        dropoff: payload.dropoff,
        dropoff_address: payload.dropoff_address,
        pickup_at,
        vehicle_type_required: payload.vehicle_type_required,
        load_type: payload.load_type,
        load_description: payload.load_description,
        estimated_weight_kg: payload.estimated_weight_kg,
        requires_helpers: payload.requires_helpers,
        helpers_count: payload.helpers_count,
        special_instructions: payload.special_instructions,
    })?;

    Ok(Json(created))
}

#[derive(Deserialize)]
pub struct GetBookingQuery {
    pub customer_id: Option<Uuid>,
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<GetBookingQuery>,
) -> Result<Json<Booking>, AppError> {
    let booking = booking::get_booking(&state, id, query.customer_id)?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub customer_id: Uuid,
    pub status: Option<BookingStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Json<BookingPage> {
    let page = booking::list_customer_bookings(
        &state,
        query.customer_id,
        query.status,
        query.limit,
        query.offset,
    );
    Json(page)
}

#[derive(Deserialize)]
pub struct CancelBookingRequest {
    pub customer_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let cancelled = booking::cancel_booking(&state, id, payload.customer_id, payload.reason)?;
    Ok(Json(cancelled))
}
