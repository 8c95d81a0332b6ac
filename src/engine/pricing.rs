use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo::{self, GeoPoint};
use crate::models::booking::LoadType;
use crate::models::quote::{PriceBreakdown, PricingQuote};
use crate::models::vehicle::VehicleType;

pub const CURRENCY: &str = "KES";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehicleRates {
    pub base: f64,
    pub per_km: f64,
    pub per_minute: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeMultipliers {
    /// 07:00-09:00 and 17:00-19:00, inclusive hour checks.
    pub peak_hours: f64,
    pub weekend: f64,
    /// 22:00-06:00.
    pub night: f64,
}

/// Process-wide pricing configuration. Admin updates replace the whole value
/// atomically behind `AppState::pricing`; quotes only ever see a complete
/// config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub base_rates: HashMap<VehicleType, VehicleRates>,
    pub load_multipliers: HashMap<LoadType, f64>,
    pub time_multipliers: TimeMultipliers,
    pub helper_rate: f64,
    pub minimum_charge: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let base_rates = HashMap::from([
            (
                VehicleType::Pickup,
                VehicleRates {
                    base: 500.0,
                    per_km: 50.0,
                    per_minute: 5.0,
                },
            ),
            (
                VehicleType::SmallTruck,
                VehicleRates {
                    base: 800.0,
                    per_km: 70.0,
                    per_minute: 8.0,
                },
            ),
            (
                VehicleType::MediumTruck,
                VehicleRates {
                    base: 1200.0,
                    per_km: 90.0,
                    per_minute: 12.0,
                },
            ),
            (
                VehicleType::LargeTruck,
                VehicleRates {
                    base: 1800.0,
                    per_km: 120.0,
                    per_minute: 18.0,
                },
            ),
            (
                VehicleType::Van,
                VehicleRates {
                    base: 700.0,
                    per_km: 60.0,
                    per_minute: 7.0,
                },
            ),
        ]);

        let load_multipliers = HashMap::from([
            (LoadType::Furniture, 1.2),
            (LoadType::Appliances, 1.3),
            (LoadType::Electronics, 1.1),
            (LoadType::Fragile, 1.4),
            (LoadType::Boxes, 1.0),
            (LoadType::Other, 1.1),
        ]);

        Self {
            base_rates,
            load_multipliers,
            time_multipliers: TimeMultipliers {
                peak_hours: 1.3,
                weekend: 1.2,
                night: 1.1,
            },
            helper_rate: 300.0,
            minimum_charge: 800.0,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        for (vehicle_type, rates) in &self.base_rates {
            if rates.base < 0.0 || rates.per_km < 0.0 || rates.per_minute < 0.0 {
                return Err(AppError::InvalidPricingConfig(format!(
                    "negative rate for {vehicle_type}"
                )));
            }
        }

        for (load_type, multiplier) in &self.load_multipliers {
            if !(0.5..=3.0).contains(multiplier) {
                return Err(AppError::InvalidPricingConfig(format!(
                    "load multiplier for {load_type} must be between 0.5 and 3.0"
                )));
            }
        }

        let tm = &self.time_multipliers;
        if tm.peak_hours < 1.0 || tm.weekend < 1.0 || tm.night < 1.0 {
            return Err(AppError::InvalidPricingConfig(
                "time multipliers must be at least 1.0".to_string(),
            ));
        }

        if self.helper_rate < 0.0 {
            return Err(AppError::InvalidPricingConfig(
                "helper rate cannot be negative".to_string(),
            ));
        }
        if self.minimum_charge < 0.0 {
            return Err(AppError::InvalidPricingConfig(
                "minimum charge cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct QuoteParams {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub vehicle_type: VehicleType,
    pub load_type: LoadType,
    pub pickup_at: NaiveDateTime,
    pub requires_helpers: bool,
    pub helpers_count: u32,
}

/// Largest applicable time-of-day factor wins; factors are never compounded.
pub fn time_multiplier(config: &PricingConfig, pickup_at: NaiveDateTime) -> f64 {
    let hour = pickup_at.hour();
    let weekday = pickup_at.weekday();

    let mut multiplier = 1.0_f64;

    if (7..=9).contains(&hour) || (17..=19).contains(&hour) {
        multiplier = multiplier.max(config.time_multipliers.peak_hours);
    }

    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        multiplier = multiplier.max(config.time_multipliers.weekend);
    }

    if hour >= 22 || hour <= 6 {
        multiplier = multiplier.max(config.time_multipliers.night);
    }

    multiplier
}

fn round_to_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn quote(config: &PricingConfig, params: &QuoteParams) -> Result<PricingQuote, AppError> {
    let distance_km = round_to_2dp(geo::haversine_km(&params.pickup, &params.dropoff));
    let duration_min = geo::estimated_duration_minutes(distance_km);

    let rates = config
        .base_rates
        .get(&params.vehicle_type)
        .ok_or(AppError::UnknownVehicleType(params.vehicle_type))?;

    let base_price = rates.base;
    let distance_price = distance_km * rates.per_km;
    let time_price = duration_min as f64 * rates.per_minute;

    let load_multiplier = config
        .load_multipliers
        .get(&params.load_type)
        .copied()
        .unwrap_or(1.0);
    let time_multiplier = time_multiplier(config, params.pickup_at);

    let helper_charges = if params.requires_helpers && params.helpers_count > 0 {
        params.helpers_count as f64 * config.helper_rate
    } else {
        0.0
    };

    let subtotal =
        (base_price + distance_price + time_price) * load_multiplier * time_multiplier
            + helper_charges;
    let total_price = subtotal.max(config.minimum_charge);

    let breakdown = PriceBreakdown {
        base_rate: format!(
            "{} {CURRENCY} (base rate for {})",
            rates.base, params.vehicle_type
        ),
        distance_rate: format!(
            "{distance_km:.2} km x {} {CURRENCY}/km = {:.0} {CURRENCY}",
            rates.per_km,
            distance_price.round()
        ),
        time_rate: format!(
            "{duration_min} min x {} {CURRENCY}/min = {:.0} {CURRENCY}",
            rates.per_minute,
            time_price.round()
        ),
        load_adjustment: format!(
            "{:.0}% ({} load)",
            load_multiplier * 100.0,
            params.load_type
        ),
        time_adjustment: format!("{:.0}% (time-based pricing)", time_multiplier * 100.0),
        helpers: if params.requires_helpers && params.helpers_count > 0 {
            format!(
                "{} helper(s) x {} {CURRENCY} = {:.0} {CURRENCY}",
                params.helpers_count, config.helper_rate, helper_charges
            )
        } else {
            "No helpers required".to_string()
        },
        minimum_charge: format!("Minimum charge: {} {CURRENCY}", config.minimum_charge),
    };

    Ok(PricingQuote {
        distance_km,
        duration_min,
        base_price: base_price.round() as i64,
        distance_price: distance_price.round() as i64,
        time_price: time_price.round() as i64,
        load_multiplier,
        time_multiplier,
        helper_charges: helper_charges.round() as i64,
        subtotal: subtotal.round() as i64,
        total_price: total_price.round() as i64,
        currency: CURRENCY.to_string(),
        breakdown,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QuoteOutcome {
    Quote(PricingQuote),
    Error { error: String },
}

/// One quote per known vehicle type; a per-type failure becomes an error
/// entry instead of failing the whole request.
pub fn quote_all_vehicle_types(
    config: &PricingConfig,
    params: &QuoteParams,
) -> BTreeMap<VehicleType, QuoteOutcome> {
    VehicleType::ALL
        .iter()
        .map(|vehicle_type| {
            let per_type = QuoteParams {
                vehicle_type: *vehicle_type,
                ..params.clone()
            };
            let outcome = match quote(config, &per_type) {
                Ok(q) => QuoteOutcome::Quote(q),
                Err(err) => QuoteOutcome::Error {
                    error: err.to_string(),
                },
            };
            (*vehicle_type, outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn params(vehicle_type: VehicleType, pickup_at: NaiveDateTime) -> QuoteParams {
        QuoteParams {
            pickup: GeoPoint {
                lat: -1.2800,
                lng: 36.8000,
            },
            dropoff: GeoPoint {
                lat: -1.3000,
                lng: 36.8200,
            },
            vehicle_type,
            load_type: LoadType::Boxes,
            pickup_at,
            requires_helpers: false,
            helpers_count: 0,
        }
    }

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn weekday_daytime_small_truck_quote() {
        let config = PricingConfig::default();
        // Wednesday 11:00, no multiplier applies
        let q = quote(&config, &params(VehicleType::SmallTruck, at(2025, 3, 12, 11, 0))).unwrap();

        assert!((q.distance_km - 3.1).abs() < 0.1);
        assert_eq!(q.duration_min, 30);
        assert_eq!(q.base_price, 800);
        assert_eq!(q.load_multiplier, 1.0);
        assert_eq!(q.time_multiplier, 1.0);
        assert_eq!(q.helper_charges, 0);
        assert_eq!(q.currency, "KES");
        // base 800 + distance ~220 + time 240, no multipliers
        let recomputed = q.base_price + q.distance_price + q.time_price;
        assert!((q.subtotal - recomputed).abs() <= 1);
        assert_eq!(q.total_price, q.subtotal.max(800));
    }

    #[test]
    fn total_never_below_minimum_charge() {
        let config = PricingConfig::default();
        let mut p = params(VehicleType::Pickup, at(2025, 3, 12, 11, 0));
        // ~0.6 km hop, well under the minimum
        p.dropoff = GeoPoint {
            lat: -1.2846,
            lng: 36.8030,
        };
        p.pickup = GeoPoint {
            lat: -1.2800,
            lng: 36.8000,
        };

        let q = quote(&config, &p).unwrap();
        assert!(q.subtotal < 800);
        assert_eq!(q.total_price, 800);
    }

    #[test]
    fn quote_is_deterministic() {
        let config = PricingConfig::default();
        let p = params(VehicleType::Van, at(2025, 3, 15, 8, 30));

        let a = quote(&config, &p).unwrap();
        let b = quote(&config, &p).unwrap();
        assert_eq!(a.total_price, b.total_price);
        assert_eq!(a.subtotal, b.subtotal);
        assert_eq!(a.time_multiplier, b.time_multiplier);
    }

    #[test]
    fn saturday_night_uses_max_factor_not_product() {
        let config = PricingConfig::default();
        // Saturday 23:00: weekend (1.2) and night (1.1) both apply
        let m = time_multiplier(&config, at(2025, 3, 15, 23, 0));
        assert_eq!(m, 1.2);
    }

    #[test]
    fn peak_hour_on_weekday() {
        let config = PricingConfig::default();
        assert_eq!(time_multiplier(&config, at(2025, 3, 12, 8, 0)), 1.3);
        assert_eq!(time_multiplier(&config, at(2025, 3, 12, 17, 0)), 1.3);
    }

    #[test]
    fn hour_boundaries_are_inclusive() {
        let config = PricingConfig::default();
        // hour 9 is still peak, hour 6 is still night
        assert_eq!(time_multiplier(&config, at(2025, 3, 12, 9, 59)), 1.3);
        assert_eq!(time_multiplier(&config, at(2025, 3, 12, 6, 59)), 1.1);
        assert_eq!(time_multiplier(&config, at(2025, 3, 12, 10, 0)), 1.0);
    }

    #[test]
    fn saturday_peak_hour_picks_peak_over_weekend() {
        let config = PricingConfig::default();
        // Saturday 08:00: peak (1.3) beats weekend (1.2)
        assert_eq!(time_multiplier(&config, at(2025, 3, 15, 8, 0)), 1.3);
    }

    #[test]
    fn helpers_are_charged_per_head() {
        let config = PricingConfig::default();
        let mut p = params(VehicleType::SmallTruck, at(2025, 3, 12, 11, 0));
        p.requires_helpers = true;
        p.helpers_count = 2;

        let q = quote(&config, &p).unwrap();
        assert_eq!(q.helper_charges, 600);

        let without = quote(&config, &params(VehicleType::SmallTruck, p.pickup_at)).unwrap();
        assert_eq!(q.subtotal, without.subtotal + 600);
    }

    #[test]
    fn missing_vehicle_rates_fail_as_unknown_type() {
        let mut config = PricingConfig::default();
        config.base_rates.remove(&VehicleType::Van);

        let err = quote(&config, &params(VehicleType::Van, at(2025, 3, 12, 11, 0))).unwrap_err();
        assert!(matches!(err, AppError::UnknownVehicleType(VehicleType::Van)));
    }

    #[test]
    fn quote_all_captures_per_type_errors() {
        let mut config = PricingConfig::default();
        config.base_rates.remove(&VehicleType::LargeTruck);

        let all = quote_all_vehicle_types(
            &config,
            &params(VehicleType::Pickup, at(2025, 3, 12, 11, 0)),
        );
        assert_eq!(all.len(), VehicleType::ALL.len());
        assert!(matches!(
            all.get(&VehicleType::LargeTruck),
            Some(QuoteOutcome::Error { .. })
        ));
        assert!(matches!(
            all.get(&VehicleType::Pickup),
            Some(QuoteOutcome::Quote(_))
        ));
    }

    #[test]
    fn config_validation_bounds() {
        let mut config = PricingConfig::default();
        config.load_multipliers.insert(LoadType::Fragile, 4.0);
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config
            .base_rates
            .insert(VehicleType::Van, VehicleRates {
                base: -1.0,
                per_km: 60.0,
                per_minute: 7.0,
            });
        assert!(config.validate().is_err());

        assert!(PricingConfig::default().validate().is_ok());
    }
}
