use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::vehicle::VehicleType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    DriverEnRoute,
    ArrivedPickup,
    Loading,
    InTransit,
    ArrivedDestination,
    Unloading,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// A booking holds its driver from acceptance until a terminal state.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != BookingStatus::Pending
    }

    /// The linear transport chain, plus `cancelled` from every non-terminal
    /// state. Anything else is rejected.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        if next == Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Pending, Accepted)
                | (Accepted, DriverEnRoute)
                | (DriverEnRoute, ArrivedPickup)
                | (ArrivedPickup, Loading)
                | (Loading, InTransit)
                | (InTransit, ArrivedDestination)
                | (ArrivedDestination, Unloading)
                | (Unloading, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::DriverEnRoute => "driver_en_route",
            BookingStatus::ArrivedPickup => "arrived_pickup",
            BookingStatus::Loading => "loading",
            BookingStatus::InTransit => "in_transit",
            BookingStatus::ArrivedDestination => "arrived_destination",
            BookingStatus::Unloading => "unloading",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement is tracked independently of the transport state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    Furniture,
    Appliances,
    Boxes,
    Electronics,
    Fragile,
    Other,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Furniture => "furniture",
            LoadType::Appliances => "appliances",
            LoadType::Boxes => "boxes",
            LoadType::Electronics => "electronics",
            LoadType::Fragile => "fragile",
            LoadType::Other => "other",
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub dropoff: GeoPoint,
    pub dropoff_address: String,
    /// Scheduled pickup as a naive local instant, combined from the
    /// customer-supplied date and HH:MM time.
    pub pickup_at: NaiveDateTime,
    pub vehicle_type_required: VehicleType,
    pub load_type: LoadType,
    pub load_description: Option<String>,
    pub estimated_weight_kg: Option<f64>,
    pub requires_helpers: bool,
    pub helpers_count: u32,
    pub special_instructions: Option<String>,
    // Pricing snapshot, frozen at creation time.
    pub estimated_distance_km: f64,
    pub estimated_duration_min: i64,
    pub base_price: i64,
    pub distance_price: i64,
    pub time_price: i64,
    pub helper_charges: i64,
    pub total_price: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::BookingStatus::*;
    use super::*;

    const CHAIN: [BookingStatus; 9] = [
        Pending,
        Accepted,
        DriverEnRoute,
        ArrivedPickup,
        Loading,
        InTransit,
        ArrivedDestination,
        Unloading,
        Completed,
    ];

    #[test]
    fn chain_steps_are_allowed() {
        for pair in CHAIN.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn skipping_ahead_is_rejected() {
        assert!(!Accepted.can_transition_to(InTransit));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Loading.can_transition_to(Unloading));
    }

    #[test]
    fn going_backwards_is_rejected() {
        assert!(!InTransit.can_transition_to(Loading));
        assert!(!Completed.can_transition_to(Unloading));
    }

    #[test]
    fn cancelled_reachable_from_every_non_terminal_state() {
        for status in CHAIN.iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(Cancelled), "{status} -> cancelled");
        }
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for terminal in [Completed, Cancelled] {
            for next in CHAIN.iter().chain([Cancelled].iter()) {
                assert!(!terminal.can_transition_to(*next));
            }
        }
    }

    #[test]
    fn active_excludes_pending_and_terminals() {
        assert!(!Pending.is_active());
        assert!(!Completed.is_active());
        assert!(!Cancelled.is_active());
        assert!(Accepted.is_active());
        assert!(InTransit.is_active());
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&DriverEnRoute).unwrap();
        assert_eq!(json, "\"driver_en_route\"");
    }
}
