use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Pickup,
    SmallTruck,
    MediumTruck,
    LargeTruck,
    Van,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        VehicleType::Pickup,
        VehicleType::SmallTruck,
        VehicleType::MediumTruck,
        VehicleType::LargeTruck,
        VehicleType::Van,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Pickup => "pickup",
            VehicleType::SmallTruck => "small_truck",
            VehicleType::MediumTruck => "medium_truck",
            VehicleType::LargeTruck => "large_truck",
            VehicleType::Van => "van",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_type: VehicleType,
    pub capacity_kg: f64,
    pub license_plate: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
