use serde::{Deserialize, Serialize};

/// Human-readable per-line explanation of a quote, for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_rate: String,
    pub distance_rate: String,
    pub time_rate: String,
    pub load_adjustment: String,
    pub time_adjustment: String,
    pub helpers: String,
    pub minimum_charge: String,
}

/// A fare estimate computed fresh per request. Never stored as its own
/// entity; booking creation copies the numeric fields onto the booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingQuote {
    pub distance_km: f64,
    pub duration_min: i64,
    pub base_price: i64,
    pub distance_price: i64,
    pub time_price: i64,
    pub load_multiplier: f64,
    pub time_multiplier: f64,
    pub helper_charges: i64,
    pub subtotal: i64,
    pub total_price: i64,
    pub currency: String,
    pub breakdown: PriceBreakdown,
}
