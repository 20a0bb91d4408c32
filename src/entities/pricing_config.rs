use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{invalid_field_error, Error};

/// Per-km rate that applies up to `up_to_km`; `None` marks the open-ended
/// last band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    pub up_to_km: Option<f64>,
    pub rate_per_km: f64,
}

/// `[start_hour, end_hour)` in local time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourWindow {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSurcharge {
    pub enabled: bool,
    pub multiplier: f64,
    pub windows: Vec<HourWindow>,
}

impl Default for PeakSurcharge {
    fn default() -> Self {
        Self {
            enabled: false,
            multiplier: 1.2,
            windows: vec![
                HourWindow {
                    start_hour: 7,
                    end_hour: 10,
                },
                HourWindow {
                    start_hour: 17,
                    end_hour: 20,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekendSurcharge {
    pub enabled: bool,
    pub multiplier: f64,
}

impl Default for WeekendSurcharge {
    fn default() -> Self {
        Self {
            enabled: false,
            multiplier: 1.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub base_fare: f64,
    pub tiers: Vec<RateTier>,
    pub vehicle_multipliers: BTreeMap<String, f64>,
    pub peak: PeakSurcharge,
    pub weekend: WeekendSurcharge,
    pub hourly_rate: f64,
    pub commission_percent: f64,
    pub utc_offset_minutes: i32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let vehicle_multipliers = [
            ("Economy", 1.0),
            ("Comfort", 1.2),
            ("Business", 1.5),
            ("Van", 1.6),
            ("VIP", 2.0),
        ]
        .into_iter()
        .map(|(name, multiplier)| (name.to_string(), multiplier))
        .collect();

        Self {
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
                RateTier {
                    up_to_km: Some(300.0),
                    rate_per_km: 1.2,
                },
                RateTier {
                    up_to_km: None,
                    rate_per_km: 1.0,
                },
            ],
            vehicle_multipliers,
            peak: PeakSurcharge::default(),
            weekend: WeekendSurcharge::default(),
            hourly_rate: 30.0,
            commission_percent: 15.0,
            utc_offset_minutes: 0,
        }
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !non_negative(self.base_fare) {
            return Err(invalid_field_error("base_fare"));
        }

        if self.tiers.is_empty() {
            return Err(invalid_field_error("tiers"));
        }

        let mut previous_bound = 0.0;
        for (index, tier) in self.tiers.iter().enumerate() {
            if !non_negative(tier.rate_per_km) {
                return Err(invalid_field_error("tiers"));
            }

            match tier.up_to_km {
                Some(bound) => {
                    if !bound.is_finite() || bound <= previous_bound {
                        return Err(invalid_field_error("tiers"));
                    }
                    previous_bound = bound;
                }
                None => {
                    if index != self.tiers.len() - 1 {
                        return Err(invalid_field_error("tiers"));
                    }
                }
            }
        }

        if self
            .vehicle_multipliers
            .values()
            .any(|multiplier| !multiplier.is_finite() || *multiplier <= 0.0)
        {
            return Err(invalid_field_error("vehicle_multipliers"));
        }

        if !self.peak.multiplier.is_finite() || self.peak.multiplier < 1.0 {
            return Err(invalid_field_error("peak"));
        }

        if self
            .peak
            .windows
            .iter()
            .any(|w| w.start_hour >= w.end_hour || w.end_hour > 24)
        {
            return Err(invalid_field_error("peak"));
        }

        if !self.weekend.multiplier.is_finite() || self.weekend.multiplier < 1.0 {
            return Err(invalid_field_error("weekend"));
        }

        if !non_negative(self.hourly_rate) {
            return Err(invalid_field_error("hourly_rate"));
        }

        if !non_negative(self.commission_percent) || self.commission_percent > 100.0 {
            return Err(invalid_field_error("commission_percent"));
        }

        if self.utc_offset_minutes.unsigned_abs() > 14 * 60 {
            return Err(invalid_field_error("utc_offset_minutes"));
        }

        Ok(())
    }

    pub fn multiplier_for(&self, vehicle_type: &str) -> Option<f64> {
        self.vehicle_multipliers.get(vehicle_type).copied()
    }
}

/// Percent deviations used to grade a driver's offer against the estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingThresholds {
    pub high_alert: f64,
    pub low_alert: f64,
    pub fair_offer: f64,
    pub good_offer: f64,
}

impl Default for PricingThresholds {
    fn default() -> Self {
        Self {
            high_alert: 50.0,
            low_alert: 50.0,
            fair_offer: 35.0,
            good_offer: 10.0,
        }
    }
}

impl PricingThresholds {
    pub fn validate(&self) -> Result<(), Error> {
        let all_valid = [
            self.high_alert,
            self.low_alert,
            self.fair_offer,
            self.good_offer,
        ]
        .iter()
        .all(|value| non_negative(*value));

        if !all_valid {
            return Err(invalid_field_error("thresholds"));
        }

        if self.good_offer > self.fair_offer {
            return Err(invalid_field_error("good_offer"));
        }

        Ok(())
    }
}

#[test]
fn default_config_is_valid() {
    assert!(PricingConfig::default().validate().is_ok());
    assert!(PricingThresholds::default().validate().is_ok());
}

#[test]
fn unbounded_tier_must_be_last() {
    let mut config = PricingConfig::default();
    config.tiers.swap(2, 3);

    assert!(config.validate().is_err());
}

#[test]
fn tier_bounds_must_increase() {
    let mut config = PricingConfig::default();
    config.tiers[1].up_to_km = Some(5.0);

    assert!(config.validate().is_err());
}

#[test]
fn surcharges_cannot_discount() {
    let mut config = PricingConfig::default();
    config.weekend.multiplier = 0.9;

    assert!(config.validate().is_err());
}

#[test]
fn utc_offset_is_bounded_to_fourteen_hours() {
    for offset in [-840, 0, 330, 840] {
        let config = PricingConfig {
            utc_offset_minutes: offset,
            ..PricingConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    for offset in [i32::MIN, -841, 841, i32::MAX] {
        let config = PricingConfig {
            utc_offset_minutes: offset,
            ..PricingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

#[test]
fn good_band_must_sit_inside_fair_band() {
    let thresholds = PricingThresholds {
        good_offer: 40.0,
        ..PricingThresholds::default()
    };

    assert!(thresholds.validate().is_err());
}

#[test]
fn partial_config_is_filled_with_defaults() {
    let config: PricingConfig = serde_json::from_str(r#"{"base_fare": 7.5}"#).unwrap();

    assert_eq!(config.base_fare, 7.5);
    assert_eq!(config.tiers.len(), 4);
    assert_eq!(config.multiplier_for("VIP"), Some(2.0));
}
