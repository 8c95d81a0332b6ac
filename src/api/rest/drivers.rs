use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::board::{self, JobFeed, JobSearch};
use crate::engine::booking::BookingPage;
use crate::engine::lifecycle;
use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::{AvailabilityStatus, Driver};
use crate::models::vehicle::{Vehicle, VehicleType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver))
        .route("/drivers/:id", get(get_driver))
        .route("/drivers/:id/location", patch(update_location))
        .route("/drivers/:id/availability", patch(update_availability))
        .route("/drivers/:id/vehicles", post(add_vehicle))
        .route("/drivers/:id/jobs", get(available_jobs))
        .route("/drivers/:id/jobs/current", get(current_job))
        .route("/drivers/:id/jobs/history", get(job_history))
        .route("/drivers/:id/jobs/:booking_id/accept", post(accept_job))
        .route("/drivers/:id/jobs/:booking_id/status", patch(update_job_status))
}

fn default_limit() -> usize {
    20
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub phone: String,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        phone: payload.phone.trim().to_string(),
        // approval is an admin action
        is_approved: false,
        availability_status: AvailabilityStatus::Offline,
        current_location: None,
        current_address: None,
        rating: 0.0,
        total_trips: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;
    Ok(Json(driver.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
    #[serde(default)]
    pub address: Option<String>,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Driver>, AppError> {
    geo::validate_coordinate(&payload.location)?;

    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    driver.current_location = Some(payload.location);
    driver.current_address = payload
        .address
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub status: AvailabilityStatus,
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    driver.availability_status = payload.status;
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

#[derive(Deserialize)]
pub struct AddVehicleRequest {
    pub vehicle_type: VehicleType,
    pub capacity_kg: f64,
    pub license_plate: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

async fn add_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    if !state.drivers.contains_key(&id) {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }
    if payload.capacity_kg <= 0.0 {
        return Err(AppError::BadRequest("capacity_kg must be > 0".to_string()));
    }

    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        driver_id: id,
        vehicle_type: payload.vehicle_type,
        capacity_kg: payload.capacity_kg,
        license_plate: payload.license_plate.trim().to_string(),
        is_active: payload.is_active,
        created_at: Utc::now(),
    };

    state.vehicles.insert(vehicle.id, vehicle.clone());
    Ok(Json(vehicle))
}

#[derive(Deserialize)]
pub struct AvailableJobsQuery {
    pub radius_km: Option<f64>,
    pub vehicle_type: Option<VehicleType>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

async fn available_jobs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailableJobsQuery>,
) -> Result<Json<JobFeed>, AppError> {
    let search = JobSearch {
        radius_km: query.radius_km.unwrap_or(10.0),
        vehicle_types: query.vehicle_type.into_iter().collect(),
        limit: query.limit,
        offset: query.offset,
    };

    let feed = board::find_available_jobs(&state, id, &search)?;
    Ok(Json(feed))
}

async fn current_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<Booking>>, AppError> {
    if !state.drivers.contains_key(&id) {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }
    Ok(Json(lifecycle::current_job(&state, id)))
}

#[derive(Deserialize)]
pub struct JobHistoryQuery {
    pub status: Option<BookingStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

async fn job_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<JobHistoryQuery>,
) -> Result<Json<BookingPage>, AppError> {
    if !state.drivers.contains_key(&id) {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }
    let page = lifecycle::job_history(&state, id, query.status, query.limit, query.offset);
    Ok(Json(page))
}

async fn accept_job(
    State(state): State<Arc<AppState>>,
    Path((id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Booking>, AppError> {
    let booking = lifecycle::accept_job(&state, id, booking_id)?;
    Ok(Json(booking))
}

#[derive(Deserialize)]
pub struct UpdateJobStatusRequest {
    pub status: BookingStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

async fn update_job_status(
    State(state): State<Arc<AppState>>,
    Path((id, booking_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateJobStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = lifecycle::update_status(
        &state,
        id,
        booking_id,
        payload.status,
        payload.cancellation_reason,
    )?;
    Ok(Json(booking))
}
