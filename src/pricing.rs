//! Fare estimation.
//!
//! A fare is the base fare plus the per-km rate of every distance band the
//! trip covers, scaled by the vehicle class multiplier and, when enabled, by
//! the peak-hour and weekend surcharges. Fares are rounded to cents.
//!
//! Every function returns `None` when the estimate is unknown (no
//! configuration loaded, unknown vehicle class, unusable distance). `None`
//! must never be read as "free".

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};

use crate::entities::member::round_cents;
use crate::entities::{BookingType, JobRequest, PricingConfig, RateTier};

pub fn calculate_price(
    config: Option<&PricingConfig>,
    distance_km: f64,
    vehicle_type: &str,
    pickup_at: DateTime<Utc>,
) -> Option<f64> {
    let config = config?;

    if !distance_km.is_finite() || distance_km < 0.0 {
        return None;
    }

    let multiplier = config.multiplier_for(vehicle_type)?;
    let fare = (config.base_fare + distance_charge(&config.tiers, distance_km))
        * multiplier
        * surcharge(config, pickup_at);

    Some(round_cents(fare))
}

pub fn calculate_hourly_price(
    config: Option<&PricingConfig>,
    hours: u32,
    vehicle_type: &str,
    pickup_at: DateTime<Utc>,
) -> Option<f64> {
    let config = config?;

    if hours == 0 {
        return None;
    }

    let multiplier = config.multiplier_for(vehicle_type)?;
    let fare = (config.base_fare + f64::from(hours) * config.hourly_rate)
        * multiplier
        * surcharge(config, pickup_at);

    Some(round_cents(fare))
}

/// Estimate for a job request, picking the distance or hourly formula from
/// the booking type.
pub fn estimate(config: Option<&PricingConfig>, request: &JobRequest) -> Option<f64> {
    match request.booking_type {
        BookingType::Hourly => calculate_hourly_price(
            config,
            request.hours?,
            &request.vehicle_type,
            request.scheduled_at,
        ),
        BookingType::Distance | BookingType::Delivery => calculate_price(
            config,
            request.distance_km?,
            &request.vehicle_type,
            request.scheduled_at,
        ),
    }
}

/// Platform share of an agreed price and what is left for the driver.
pub fn split_commission(config: Option<&PricingConfig>, price: f64) -> (f64, f64) {
    let percent = config.map(|c| c.commission_percent).unwrap_or(0.0);
    let commission = round_cents(price * percent / 100.0);

    (commission, round_cents(price - commission))
}

fn distance_charge(tiers: &[RateTier], distance_km: f64) -> f64 {
    let mut charge = 0.0;
    let mut lower = 0.0;

    for tier in tiers {
        if distance_km <= lower {
            return charge;
        }

        let upper = tier.up_to_km.unwrap_or(f64::INFINITY);
        charge += (distance_km.min(upper) - lower) * tier.rate_per_km;
        lower = upper;
    }

    // the last band is bounded and the trip goes past it
    if let Some(last) = tiers.last() {
        if distance_km > lower {
            charge += (distance_km - lower) * last.rate_per_km;
        }
    }

    charge
}

fn surcharge(config: &PricingConfig, pickup_at: DateTime<Utc>) -> f64 {
    let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let local = pickup_at.with_timezone(&offset);

    let mut multiplier = 1.0;

    if config.peak.enabled && config.peak.windows.iter().any(|w| w.contains(local.hour())) {
        multiplier *= config.peak.multiplier;
    }

    if config.weekend.enabled && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        multiplier *= config.weekend.multiplier;
    }

    multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Wednesday
    fn weekday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn two_band_config() -> PricingConfig {
        PricingConfig {
            base_fare: 5.0,
            tiers: vec![
                RateTier {
                    up_to_km: Some(10.0),
                    rate_per_km: 2.0,
                },
                RateTier {
                    up_to_km: Some(100.0),
                    rate_per_km: 1.5,
                },
            ],
            ..PricingConfig::default()
        }
    }

    #[test]
    fn twelve_km_economy() {
        let config = two_band_config();

        let fare = calculate_price(Some(&config), 12.0, "Economy", weekday_noon());

        assert_eq!(fare, Some(28.0));
    }

    #[test]
    fn unknown_without_config() {
        assert_eq!(calculate_price(None, 12.0, "Economy", weekday_noon()), None);
        assert_eq!(calculate_hourly_price(None, 2, "Economy", weekday_noon()), None);
    }

    #[test]
    fn unknown_vehicle_type_or_bad_distance() {
        let config = PricingConfig::default();

        assert_eq!(calculate_price(Some(&config), 12.0, "Rickshaw", weekday_noon()), None);
        assert_eq!(calculate_price(Some(&config), -1.0, "Economy", weekday_noon()), None);
        assert_eq!(calculate_price(Some(&config), f64::NAN, "Economy", weekday_noon()), None);
    }

    #[test]
    fn never_below_base_fare_times_multiplier() {
        let config = PricingConfig::default();

        for (vehicle_type, multiplier) in config.vehicle_multipliers.iter() {
            let floor = round_cents(config.base_fare * multiplier);

            for step in 0..200 {
                let distance = f64::from(step) * 2.5;
                let fare = calculate_price(Some(&config), distance, vehicle_type, weekday_noon()).unwrap();
                assert!(fare >= floor, "{} km {}: {} < {}", distance, vehicle_type, fare, floor);
            }
        }
    }

    #[test]
    fn monotonic_in_distance() {
        let mut config = PricingConfig::default();
        config.peak.enabled = true;
        config.weekend.enabled = true;

        for vehicle_type in config.vehicle_multipliers.keys() {
            let mut previous = 0.0;

            for step in 0..1000 {
                let distance = f64::from(step) * 0.5;
                let fare = calculate_price(Some(&config), distance, vehicle_type, weekday_noon()).unwrap();
                assert!(fare >= previous);
                previous = fare;
            }
        }
    }

    #[test]
    fn distance_beyond_bounded_last_band_uses_its_rate() {
        let config = two_band_config();

        // 5 + 10 * 2 + 90 * 1.5 + 10 * 1.5
        let fare = calculate_price(Some(&config), 110.0, "Economy", weekday_noon());

        assert_eq!(fare, Some(175.0));
    }

    #[test]
    fn peak_surcharge_only_when_enabled_and_inside_window() {
        let mut config = two_band_config();
        let rush_hour = Utc.with_ymd_and_hms(2024, 5, 15, 8, 30, 0).unwrap();

        assert_eq!(calculate_price(Some(&config), 12.0, "Economy", rush_hour), Some(28.0));

        config.peak.enabled = true;
        assert_eq!(calculate_price(Some(&config), 12.0, "Economy", rush_hour), Some(33.6));
        assert_eq!(calculate_price(Some(&config), 12.0, "Economy", weekday_noon()), Some(28.0));
    }

    #[test]
    fn weekend_and_peak_stack() {
        let mut config = two_band_config();
        config.peak.enabled = true;
        config.weekend.enabled = true;

        let saturday_rush = Utc.with_ymd_and_hms(2024, 5, 18, 18, 0, 0).unwrap();

        // 28 * 1.2 * 1.1
        assert_eq!(calculate_price(Some(&config), 12.0, "Economy", saturday_rush), Some(36.96));
    }

    #[test]
    fn surcharges_use_local_time() {
        let mut config = two_band_config();
        config.peak.enabled = true;
        config.utc_offset_minutes = 120;

        // 06:30 UTC is 08:30 local
        let pickup = Utc.with_ymd_and_hms(2024, 5, 15, 6, 30, 0).unwrap();

        assert_eq!(calculate_price(Some(&config), 12.0, "Economy", pickup), Some(33.6));
    }

    #[test]
    fn hourly_fare() {
        let config = PricingConfig::default();

        // (5 + 3 * 30) * 1.6
        let fare = calculate_hourly_price(Some(&config), 3, "Van", weekday_noon());

        assert_eq!(fare, Some(152.0));
        assert_eq!(calculate_hourly_price(Some(&config), 0, "Van", weekday_noon()), None);
    }

    #[test]
    fn estimate_follows_booking_type() {
        let config = two_band_config();
        let mut request = crate::entities::job::test_request(BookingType::Distance);
        request.scheduled_at = weekday_noon();

        assert_eq!(estimate(Some(&config), &request), Some(28.0));

        request.distance_km = None;
        assert_eq!(estimate(Some(&config), &request), None);

        let mut request = crate::entities::job::test_request(BookingType::Hourly);
        request.scheduled_at = weekday_noon();
        // 5 + 3 * 30
        assert_eq!(estimate(Some(&config), &request), Some(95.0));
    }

    #[test]
    fn commission_split() {
        let config = PricingConfig::default();

        assert_eq!(split_commission(Some(&config), 100.0), (15.0, 85.0));
        assert_eq!(split_commission(None, 100.0), (0.0, 100.0));
    }
}
