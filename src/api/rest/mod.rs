pub mod admin;
pub mod bookings;
pub mod drivers;
pub mod pricing;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(bookings::router())
        .merge(drivers::router())
        .merge(pricing::router())
        .merge(admin::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Combines the customer-supplied ISO date and HH:MM time into one naive
/// local pickup instant.
pub(crate) fn parse_pickup_at(date: &str, time: &str) -> Result<NaiveDateTime, AppError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid pickup_date: {date}")))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| AppError::BadRequest(format!("invalid pickup_time: {time}")))?;
    Ok(date.and_time(time))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    drivers: usize,
    vehicles: usize,
    bookings: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        drivers: state.drivers.len(),
        vehicles: state.vehicles.len(),
        bookings: state.bookings.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
