use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::booking::BookingPage;
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::AvailabilityStatus;
use crate::state::AppState;

/// Claims a pending job for a driver.
///
/// Guard order: driver approved, driver available, no other active job,
/// booking exists, booking pending, booking unassigned, matching active
/// vehicle. The claim and the driver-busy flip both happen under the
/// booking's map entry guard, so two drivers racing for the same job see
/// exactly one success (the loser fails with `JobAlreadyTaken` or
/// `JobNotPending`), and a concurrent cancellation can never observe the
/// claim without the matching busy driver.
pub fn accept_job(state: &AppState, driver_id: Uuid, booking_id: Uuid) -> Result<Booking, AppError> {
    let result = try_accept(state, driver_id, booking_id);

    let outcome = if result.is_ok() { "success" } else { "rejected" };
    state
        .metrics
        .job_accepts_total
        .with_label_values(&[outcome])
        .inc();

    result
}

fn try_accept(state: &AppState, driver_id: Uuid, booking_id: Uuid) -> Result<Booking, AppError> {
    {
        let driver = state
            .drivers
            .get(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

        if !driver.is_approved {
            return Err(AppError::DriverNotApproved);
        }
        if driver.availability_status != AvailabilityStatus::Available {
            return Err(AppError::DriverNotAvailable(
                driver.availability_status.to_string(),
            ));
        }
    }

    if has_active_job(state, driver_id) {
        return Err(AppError::DriverHasActiveJob);
    }

    // Critical section: check-and-claim under the booking's entry guard. The
    // paired driver-busy flip happens while the guard is still held, so a
    // concurrent cancellation cannot slip in between the claim and the flip.
    let accepted = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::JobNotFound(booking_id.to_string()))?;

        if booking.status != BookingStatus::Pending {
            return Err(AppError::JobNotPending(booking.status));
        }
        if booking.driver_id.is_some() {
            return Err(AppError::JobAlreadyTaken);
        }

        let vehicle = state
            .vehicles
            .iter()
            .find(|v| {
                v.driver_id == driver_id
                    && v.is_active
                    && v.vehicle_type == booking.vehicle_type_required
            })
            .map(|v| v.value().clone())
            .ok_or(AppError::VehicleTypeMismatch(booking.vehicle_type_required))?;

        {
            let mut driver = state
                .drivers
                .get_mut(&driver_id)
                .ok_or_else(|| AppError::Internal(format!("driver {driver_id} disappeared")))?;

            // Re-checked under the guard: the driver may have gone busy or
            // offline since the first look. The booking is untouched at this
            // point, so failing here leaves it on the board.
            if driver.availability_status != AvailabilityStatus::Available {
                return Err(AppError::DriverNotAvailable(
                    driver.availability_status.to_string(),
                ));
            }
            driver.availability_status = AvailabilityStatus::Busy;
            driver.updated_at = Utc::now();
        }

        booking.driver_id = Some(driver_id);
        booking.vehicle_id = Some(vehicle.id);
        booking.status = BookingStatus::Accepted;
        booking.accepted_at = Some(Utc::now());
        booking.clone()
    };

    state.metrics.active_jobs.inc();
    state
        .metrics
        .job_transitions_total
        .with_label_values(&[BookingStatus::Accepted.as_str()])
        .inc();

    info!(
        booking_id = %booking_id,
        driver_id = %driver_id,
        booking_number = %accepted.booking_number,
        "job accepted"
    );

    Ok(accepted)
}

fn has_active_job(state: &AppState, driver_id: Uuid) -> bool {
    state
        .bookings
        .iter()
        .any(|entry| entry.driver_id == Some(driver_id) && entry.status.is_active())
}

/// Walks an owned booking one step along the transport chain, or cancels it.
pub fn update_status(
    state: &AppState,
    driver_id: Uuid,
    booking_id: Uuid,
    new_status: BookingStatus,
    reason: Option<String>,
) -> Result<Booking, AppError> {
    let updated = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .filter(|b| b.driver_id == Some(driver_id))
            .ok_or_else(|| {
                AppError::JobNotFound(format!("{booking_id} (not assigned to this driver)"))
            })?;

        if !booking.status.can_transition_to(new_status) {
            return Err(AppError::InvalidTransition {
                from: booking.status,
                to: new_status,
            });
        }

        apply_transition(&mut booking, new_status, reason, "Cancelled by driver");
        booking.clone()
    };

    if new_status.is_terminal() {
        release_driver(state, driver_id, new_status == BookingStatus::Completed);
        state.metrics.active_jobs.dec();
    }

    state
        .metrics
        .job_transitions_total
        .with_label_values(&[new_status.as_str()])
        .inc();

    info!(
        booking_id = %booking_id,
        driver_id = %driver_id,
        status = %new_status,
        "job status updated"
    );

    Ok(updated)
}

/// Admin override: sets the status directly, skipping the transition table,
/// but still applying terminal side effects so the driver is released and
/// timestamps stay consistent.
pub fn force_status(
    state: &AppState,
    booking_id: Uuid,
    new_status: BookingStatus,
    reason: Option<String>,
) -> Result<Booking, AppError> {
    let (updated, driver_id, was_active, was_terminal) = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        let was_active = booking.status.is_active();
        let was_terminal = booking.status.is_terminal();
        apply_transition(&mut booking, new_status, reason, "Cancelled by admin");
        (booking.clone(), booking.driver_id, was_active, was_terminal)
    };

    // Terminal side effects only on actually leaving a non-terminal state;
    // a repeated override of an already-terminal booking must not release
    // the driver or bump the trip counter again.
    if new_status.is_terminal() && !was_terminal {
        if let Some(driver_id) = driver_id {
            release_driver(state, driver_id, new_status == BookingStatus::Completed);
        }
        if was_active {
            state.metrics.active_jobs.dec();
        }
    }

    state
        .metrics
        .job_transitions_total
        .with_label_values(&[new_status.as_str()])
        .inc();

    info!(booking_id = %booking_id, status = %new_status, "booking status overridden by admin");

    Ok(updated)
}

fn apply_transition(
    booking: &mut Booking,
    new_status: BookingStatus,
    reason: Option<String>,
    default_reason: &str,
) {
    booking.status = new_status;
    match new_status {
        BookingStatus::DriverEnRoute => booking.started_at = Some(Utc::now()),
        BookingStatus::Completed => booking.completed_at = Some(Utc::now()),
        BookingStatus::Cancelled => {
            booking.cancelled_at = Some(Utc::now());
            booking.cancellation_reason = Some(
                reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(default_reason)
                    .to_string(),
            );
        }
        _ => {}
    }
}

/// On completion or cancellation the driver goes back to `available`
/// regardless of prior state; completion also bumps the trip counter.
fn release_driver(state: &AppState, driver_id: Uuid, completed: bool) {
    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        driver.availability_status = AvailabilityStatus::Available;
        if completed {
            driver.total_trips += 1;
        }
        driver.updated_at = Utc::now();
    }
}

/// The driver's single active booking, if any; newest acceptance wins if the
/// store is ever inconsistent.
pub fn current_job(state: &AppState, driver_id: Uuid) -> Option<Booking> {
    state
        .bookings
        .iter()
        .filter(|entry| entry.driver_id == Some(driver_id) && entry.status.is_active())
        .max_by_key(|entry| entry.accepted_at)
        .map(|entry| entry.value().clone())
}

pub fn job_history(
    state: &AppState,
    driver_id: Uuid,
    status: Option<BookingStatus>,
    limit: usize,
    offset: usize,
) -> BookingPage {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .filter(|entry| {
            let b = entry.value();
            b.driver_id == Some(driver_id) && status.is_none_or(|s| b.status == s)
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
