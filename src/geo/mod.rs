use serde::{Deserialize, Serialize};

use crate::error::AppError;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Average city driving speed used for duration estimates.
const AVERAGE_SPEED_KMH: f64 = 25.0;
const MIN_DURATION_MIN: i64 = 30;

pub const MIN_TRIP_KM: f64 = 0.5;
pub const MAX_TRIP_KM: f64 = 100.0;

/// Service-area bounds: Nairobi and surrounding areas, edge-inclusive.
pub const SERVICE_AREA_NORTH: f64 = -1.163;
pub const SERVICE_AREA_SOUTH: f64 = -1.444;
pub const SERVICE_AREA_EAST: f64 = 37.103;
pub const SERVICE_AREA_WEST: f64 = 36.65;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn validate_coordinate(point: &GeoPoint) -> Result<GeoPoint, AppError> {
    if !point.lat.is_finite() || !point.lng.is_finite() {
        return Err(AppError::InvalidCoordinate(
            "coordinates must be valid numbers".to_string(),
        ));
    }
    if point.lat < -90.0 || point.lat > 90.0 {
        return Err(AppError::InvalidCoordinate(
            "latitude must be between -90 and 90".to_string(),
        ));
    }
    if point.lng < -180.0 || point.lng > 180.0 {
        return Err(AppError::InvalidCoordinate(
            "longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(*point)
}

pub fn is_within_service_area(point: &GeoPoint) -> bool {
    point.lat >= SERVICE_AREA_SOUTH
        && point.lat <= SERVICE_AREA_NORTH
        && point.lng >= SERVICE_AREA_WEST
        && point.lng <= SERVICE_AREA_EAST
}

/// Rejects trips shorter than 0.5 km or longer than 100 km and returns the
/// measured distance otherwise.
pub fn validate_trip_distance(pickup: &GeoPoint, dropoff: &GeoPoint) -> Result<f64, AppError> {
    let distance = haversine_km(pickup, dropoff);

    if distance < MIN_TRIP_KM {
        return Err(AppError::TripTooShort(distance));
    }
    if distance > MAX_TRIP_KM {
        return Err(AppError::TripTooLong(distance));
    }

    Ok(distance)
}

/// Duration estimate at city speed, floored at 30 minutes.
pub fn estimated_duration_minutes(distance_km: f64) -> i64 {
    let minutes = (distance_km / AVERAGE_SPEED_KMH * 60.0).round() as i64;
    minutes.max(MIN_DURATION_MIN)
}
