use chrono::{Duration, Local, NaiveDateTime, Utc};
use dashmap::mapref::entry::Entry;
use rand::Rng;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::pricing::{self, QuoteParams};
use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::models::booking::{Booking, BookingStatus, LoadType, PaymentStatus};
use crate::models::driver::AvailabilityStatus;
use crate::models::quote::PriceBreakdown;
use crate::models::vehicle::VehicleType;
use crate::state::AppState;

const BOOKING_NUMBER_ATTEMPTS: u32 = 5;
const MIN_ADVANCE_MINUTES: i64 = 30;
const MAX_ADVANCE_DAYS: i64 = 7;
const MAX_ADDRESS_LEN: usize = 500;

#[derive(Debug, Clone)]
pub struct CreateBookingParams {
    pub customer_id: Uuid,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub dropoff: GeoPoint,
    pub dropoff_address: String,
    pub pickup_at: NaiveDateTime,
    pub vehicle_type_required: VehicleType,
    pub load_type: LoadType,
    pub load_description: Option<String>,
    pub estimated_weight_kg: Option<f64>,
    pub requires_helpers: bool,
    pub helpers_count: u32,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub pricing_breakdown: PriceBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

fn format_address(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("address cannot be empty".to_string()));
    }
    Ok(trimmed.chars().take(MAX_ADDRESS_LEN).collect())
}

fn validate_pickup_time(pickup_at: NaiveDateTime) -> Result<(), AppError> {
    let now = Local::now().naive_local();

    if pickup_at < now + Duration::minutes(MIN_ADVANCE_MINUTES) {
        return Err(AppError::PickupTimeTooSoon);
    }
    if pickup_at > now + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(AppError::PickupTimeTooFarOut);
    }
    Ok(())
}

/// Reserves a fresh booking number: `MN` + last six digits of the epoch
/// millis + a four-digit random suffix. The entry API makes the
/// check-then-insert atomic; collisions retry with a new candidate.
fn reserve_booking_number(state: &AppState, booking_id: Uuid) -> Result<String, AppError> {
    let mut rng = rand::thread_rng();

    for _ in 0..BOOKING_NUMBER_ATTEMPTS {
        let millis = Utc::now().timestamp_millis().to_string();
        let stamp = &millis[millis.len().saturating_sub(6)..];
        let suffix: u32 = rng.gen_range(0..10_000);
        let candidate = format!("MN{stamp}{suffix:04}");

        match state.booking_numbers.entry(candidate.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(booking_id);
                return Ok(candidate);
            }
            Entry::Occupied(_) => continue,
        }
    }

    Err(AppError::BookingNumberExhausted(BOOKING_NUMBER_ATTEMPTS))
}

pub fn create_booking(
    state: &AppState,
    params: CreateBookingParams,
) -> Result<CreatedBooking, AppError> {
    geo::validate_coordinate(&params.pickup)?;
    geo::validate_coordinate(&params.dropoff)?;

    if !geo::is_within_service_area(&params.pickup) {
        return Err(AppError::OutOfServiceArea("pickup".to_string()));
    }
    if !geo::is_within_service_area(&params.dropoff) {
        return Err(AppError::OutOfServiceArea("dropoff".to_string()));
    }

    geo::validate_trip_distance(&params.pickup, &params.dropoff)?;
    validate_pickup_time(params.pickup_at)?;

    let pickup_address = format_address(&params.pickup_address)?;
    let dropoff_address = format_address(&params.dropoff_address)?;

    let config = state.pricing_config();
    let quote = pricing::quote(&config, &QuoteParams {
        pickup: params.pickup,
        dropoff: params.dropoff,
        vehicle_type: params.vehicle_type_required,
        load_type: params.load_type,
        pickup_at: params.pickup_at,
        requires_helpers: params.requires_helpers,
        helpers_count: params.helpers_count,
    })?;

    let booking_id = Uuid::new_v4();
    let booking_number = reserve_booking_number(state, booking_id)?;

    let booking = Booking {
        id: booking_id,
        booking_number,
        customer_id: params.customer_id,
        driver_id: None,
        vehicle_id: None,
        pickup: params.pickup,
        pickup_address,
        dropoff: params.dropoff,
        dropoff_address,
        pickup_at: params.pickup_at,
        vehicle_type_required: params.vehicle_type_required,
        load_type: params.load_type,
        load_description: params
            .load_description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        estimated_weight_kg: params.estimated_weight_kg,
        requires_helpers: params.requires_helpers,
        helpers_count: params.helpers_count,
        special_instructions: params
            .special_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        estimated_distance_km: quote.distance_km,
        estimated_duration_min: quote.duration_min,
        base_price: quote.base_price,
        distance_price: quote.distance_price,
        time_price: quote.time_price,
        helper_charges: quote.helper_charges,
        total_price: quote.total_price,
        currency: quote.currency.clone(),
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        created_at: Utc::now(),
        accepted_at: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        cancellation_reason: None,
    };

    state.bookings.insert(booking.id, booking.clone());
    state.metrics.bookings_created_total.inc();

    info!(
        booking_id = %booking.id,
        booking_number = %booking.booking_number,
        total_price = booking.total_price,
        "booking created"
    );

    Ok(CreatedBooking {
        booking,
        pricing_breakdown: quote.breakdown,
    })
}

pub fn get_booking(
    state: &AppState,
    booking_id: Uuid,
    customer_id: Option<Uuid>,
) -> Result<Booking, AppError> {
    let booking = state
        .bookings
        .get(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

    if let Some(customer_id) = customer_id {
        if booking.customer_id != customer_id {
            return Err(AppError::NotFound(format!("booking {booking_id} not found")));
        }
    }

    Ok(booking.value().clone())
}

pub fn list_customer_bookings(
    state: &AppState,
    customer_id: Uuid,
    status: Option<BookingStatus>,
    limit: usize,
    offset: usize,
) -> BookingPage {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .filter(|entry| {
            let b = entry.value();
            b.customer_id == customer_id && status.is_none_or(|s| b.status == s)
        })
        .map(|entry| entry.value().clone())
        .collect();

    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = bookings.len();
    let bookings: Vec<Booking> = bookings.into_iter().skip(offset).take(limit).collect();

    BookingPage {
        bookings,
        total,
        limit,
        offset,
        has_more: offset.saturating_add(limit) < total,
    }
}

/// Customer-side cancellation: allowed from any non-terminal status, and
/// releases the assigned driver, if any.
pub fn cancel_booking(
    state: &AppState,
    booking_id: Uuid,
    customer_id: Uuid,
    reason: Option<String>,
) -> Result<Booking, AppError> {
    let (cancelled, driver_id, was_active) = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .filter(|b| b.customer_id == customer_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if booking.status.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Cancelled,
            });
        }

        let was_active = booking.status.is_active();
        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(Utc::now());
        booking.cancellation_reason = Some(
            reason
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Cancelled by customer")
                .to_string(),
        );

        (booking.clone(), booking.driver_id, was_active)
    };

    if let Some(driver_id) = driver_id {
        if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
            driver.availability_status = AvailabilityStatus::Available;
            driver.updated_at = Utc::now();
        }
    }

    state
        .metrics
        .job_transitions_total
        .with_label_values(&[BookingStatus::Cancelled.as_str()])
        .inc();
    if was_active {
        state.metrics.active_jobs.dec();
    }

    info!(booking_id = %booking_id, "booking cancelled by customer");

    Ok(cancelled)
}
