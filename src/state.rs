use std::sync::RwLock;

use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::pricing::PricingConfig;
use crate::models::booking::Booking;
use crate::models::driver::Driver;
use crate::models::vehicle::Vehicle;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub drivers: DashMap<Uuid, Driver>,
    pub vehicles: DashMap<Uuid, Vehicle>,
    pub bookings: DashMap<Uuid, Booking>,
    /// Uniqueness index for booking numbers; reservation happens through the
    /// entry API so concurrent creations cannot claim the same number.
    pub booking_numbers: DashMap<String, Uuid>,
    pricing: RwLock<PricingConfig>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            drivers: DashMap::new(),
            vehicles: DashMap::new(),
            bookings: DashMap::new(),
            booking_numbers: DashMap::new(),
            pricing: RwLock::new(PricingConfig::default()),
            metrics: Metrics::new(),
        }
    }

    /// Snapshot of the current pricing config. A quote computed from the
    /// snapshot never observes a half-applied admin update.
    pub fn pricing_config(&self) -> PricingConfig {
        self.pricing
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replaces the whole pricing config in one swap.
    pub fn swap_pricing_config(&self, config: PricingConfig) {
        let mut guard = self
            .pricing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = config;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
