use std::collections::BTreeSet;
use std::f64::consts::PI;

use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::AvailabilityStatus;
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone)]
pub struct JobSearch {
    pub radius_km: f64,
    /// Optional caller filter; intersected with the driver's own vehicle
    /// types, never widened beyond them.
    pub vehicle_types: Vec<VehicleType>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateJob {
    #[serde(flatten)]
    pub booking: Booking,
    pub distance_from_driver_km: Option<f64>,
    pub estimated_travel_time_min: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobFeed {
    pub jobs: Vec<CandidateJob>,
    pub total: usize,
    pub message: Option<String>,
    pub driver_location: Option<GeoPoint>,
    pub search_radius_km: f64,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Open, unassigned, future bookings this driver could take, nearest first
/// when the driver's position is known.
///
/// A driver who is not `available` gets an empty feed with a message rather
/// than an error, so callers can tell "no access" from "no jobs right now".
pub fn find_available_jobs(
    state: &AppState,
    driver_id: Uuid,
    search: &JobSearch,
) -> Result<JobFeed, AppError> {
    let driver = state
        .drivers
        .get(&driver_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if !driver.is_approved {
        return Err(AppError::DriverNotApproved);
    }

    let driver_vehicle_types: BTreeSet<VehicleType> = state
        .vehicles
        .iter()
        .filter(|entry| entry.driver_id == driver_id && entry.is_active)
        .map(|entry| entry.vehicle_type)
        .collect();

    if driver_vehicle_types.is_empty() {
        return Err(AppError::NoActiveVehicle);
    }

    if driver.availability_status != AvailabilityStatus::Available {
        return Ok(JobFeed {
            jobs: Vec::new(),
            total: 0,
            message: Some(format!(
                "Driver status is {}. Set status to 'available' to see jobs.",
                driver.availability_status
            )),
            driver_location: driver.current_location,
            search_radius_km: search.radius_km,
            limit: search.limit,
            offset: search.offset,
            has_more: false,
        });
    }

    let allowed_types: BTreeSet<VehicleType> = if search.vehicle_types.is_empty() {
        driver_vehicle_types
    } else {
        search
            .vehicle_types
            .iter()
            .copied()
            .filter(|vt| driver_vehicle_types.contains(vt))
            .collect()
    };

    // Rectangular prefilter approximating the radius; candidates in the box
    // corners get through and simply sort last by exact distance.
    let bounds = driver.current_location.map(|loc| {
        let lat_delta = search.radius_km / KM_PER_DEGREE;
        let lng_delta = search.radius_km / (KM_PER_DEGREE * (loc.lat * PI / 180.0).cos());
        (
            loc.lat - lat_delta,
            loc.lat + lat_delta,
            loc.lng - lng_delta,
            loc.lng + lng_delta,
        )
    });

    let now = Local::now().naive_local();

    let mut candidates: Vec<CandidateJob> = state
        .bookings
        .iter()
        .filter(|entry| {
            let b = entry.value();
            b.status == BookingStatus::Pending
                && b.driver_id.is_none()
                && b.pickup_at >= now
                && allowed_types.contains(&b.vehicle_type_required)
                && bounds.is_none_or(|(lat_min, lat_max, lng_min, lng_max)| {
                    b.pickup.lat >= lat_min
                        && b.pickup.lat <= lat_max
                        && b.pickup.lng >= lng_min
                        && b.pickup.lng <= lng_max
                })
        })
        .map(|entry| {
            let booking = entry.value().clone();
            let distance_from_driver_km = driver
                .current_location
                .map(|loc| geo::haversine_km(&loc, &booking.pickup));
            let estimated_travel_time_min =
                distance_from_driver_km.map(|d| (d / 25.0 * 60.0).round() as i64);
            CandidateJob {
                booking,
                distance_from_driver_km,
                estimated_travel_time_min,
            }
        })
        .collect();

    if driver.current_location.is_some() {
        candidates.sort_by(|a, b| {
            let da = a.distance_from_driver_km.unwrap_or(f64::INFINITY);
            let db = b.distance_from_driver_km.unwrap_or(f64::INFINITY);
            da.total_cmp(&db)
        });
    } else {
        candidates.sort_by_key(|c| c.booking.pickup_at);
    }

    let total = candidates.len();
    let jobs: Vec<CandidateJob> = candidates
        .into_iter()
        .skip(search.offset)
        .take(search.limit)
        .collect();

    Ok(JobFeed {
        jobs,
        total,
        message: None,
        driver_location: driver.current_location,
        search_radius_km: search.radius_km,
        limit: search.limit,
        offset: search.offset,
        has_more: search.offset.saturating_add(search.limit) < total,
    })
}
