use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Busy,
    Offline,
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Busy => "busy",
            AvailabilityStatus::Offline => "offline",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_approved: bool,
    pub availability_status: AvailabilityStatus,
    /// Last reported position; drivers without one get an unordered,
    /// proximity-unfiltered job feed.
    pub current_location: Option<GeoPoint>,
    pub current_address: Option<String>,
    pub rating: f64,
    pub total_trips: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
