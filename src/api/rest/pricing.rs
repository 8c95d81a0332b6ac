use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::Deserialize;

use crate::engine::pricing::{self, PricingConfig, QuoteOutcome, QuoteParams};
use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::models::booking::LoadType;
use crate::models::quote::PricingQuote;
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pricing/quote", post(quote))
        .route("/pricing/quote/all", post(quote_all))
        .route("/pricing/config", get(get_config))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub vehicle_type: Option<VehicleType>,
    pub load_type: LoadType,
    pub pickup_date: String,
    pub pickup_time: String,
    #[serde(default)]
    pub requires_helpers: bool,
    #[serde(default)]
    pub helpers_count: u32,
}

impl QuoteRequest {
    fn into_params(self, vehicle_type: VehicleType) -> Result<QuoteParams, AppError> {
        geo::validate_coordinate(&self.pickup)?;
        geo::validate_coordinate(&self.dropoff)?;
        geo::validate_trip_distance(&self.pickup, &self.dropoff)?;
        let pickup_at = super::parse_pickup_at(&self.pickup_date, &self.pickup_time)?;

        Ok(QuoteParams {
            pickup: self.pickup,
            dropoff: self.dropoff,
            vehicle_type,
            load_type: self.load_type,
            pickup_at,
            requires_helpers: self.requires_helpers,
            helpers_count: self.helpers_count,
        })
    }
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<PricingQuote>, AppError> {
    let vehicle_type = payload
        .vehicle_type
        .ok_or_else(|| AppError::BadRequest("vehicle_type is required".to_string()))?;
    let params = payload.into_params(vehicle_type)?;

    let config = state.pricing_config();
    let quote = pricing::quote(&config, &params)?;

    state
        .metrics
        .quotes_total
        .with_label_values(&[vehicle_type.as_str()])
        .inc();

    Ok(Json(quote))
}

async fn quote_all(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<BTreeMap<VehicleType, QuoteOutcome>>, AppError> {
    // vehicle type is irrelevant here, every known type gets quoted
    let params = payload.into_params(VehicleType::Pickup)?;

    let config = state.pricing_config();
    let quotes = pricing::quote_all_vehicle_types(&config, &params);

    for vehicle_type in VehicleType::ALL {
        state
            .metrics
            .quotes_total
            .with_label_values(&[vehicle_type.as_str()])
            .inc();
    }

    Ok(Json(quotes))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<PricingConfig> {
    Json(state.pricing_config())
}
