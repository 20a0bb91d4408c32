//! Feedback shown to a driver while they type an offer.

use serde::{Deserialize, Serialize};

use crate::entities::PricingThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferTier {
    TooHigh,
    TooLow,
    Good,
    Fair,
    Normal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Red,
    Green,
    Blue,
}

impl OfferTier {
    pub fn tone(&self) -> Tone {
        match self {
            Self::TooHigh | Self::TooLow => Tone::Red,
            Self::Good => Tone::Green,
            Self::Fair | Self::Normal => Tone::Blue,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::TooHigh => "offer is well above the estimate",
            Self::TooLow => "offer is well below the estimate",
            Self::Good => "good offer, high chance of acceptance",
            Self::Fair => "fair offer, great value for the client",
            Self::Normal => "offer is within the usual range",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfferFeedback {
    pub tier: OfferTier,
    pub tone: Tone,
    pub message: String,
    /// Signed percent deviation from the estimate.
    pub deviation_percent: f64,
}

/// Grades `amount` against `estimate`. Returns `None` when there is no
/// usable estimate.
pub fn evaluate(amount: f64, estimate: f64, thresholds: &PricingThresholds) -> Option<OfferFeedback> {
    if !estimate.is_finite() || estimate <= 0.0 || !amount.is_finite() {
        return None;
    }

    let deviation = (amount - estimate) * 100.0 / estimate;
    let tier = classify(deviation, thresholds);

    Some(OfferFeedback {
        tier,
        tone: tier.tone(),
        message: tier.message().into(),
        deviation_percent: (deviation * 100.0).round() / 100.0,
    })
}

// alerts first, then the symmetric bands, widest last
fn classify(deviation: f64, thresholds: &PricingThresholds) -> OfferTier {
    if deviation > thresholds.high_alert {
        return OfferTier::TooHigh;
    }

    if -deviation > thresholds.low_alert {
        return OfferTier::TooLow;
    }

    let distance = deviation.abs();

    if distance <= thresholds.good_offer {
        OfferTier::Good
    } else if distance <= thresholds.fair_offer {
        OfferTier::Fair
    } else {
        OfferTier::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> PricingThresholds {
        PricingThresholds {
            high_alert: 50.0,
            low_alert: 50.0,
            fair_offer: 35.0,
            good_offer: 10.0,
        }
    }

    fn tier(amount: f64, estimate: f64) -> Option<OfferTier> {
        evaluate(amount, estimate, &thresholds()).map(|feedback| feedback.tier)
    }

    #[test]
    fn five_percent_above_is_good() {
        let feedback = evaluate(105.0, 100.0, &thresholds()).unwrap();

        assert_eq!(feedback.tier, OfferTier::Good);
        assert_eq!(feedback.tone, Tone::Green);
        assert_eq!(feedback.deviation_percent, 5.0);
    }

    #[test]
    fn sixty_percent_above_is_too_high() {
        let feedback = evaluate(160.0, 100.0, &thresholds()).unwrap();

        assert_eq!(feedback.tier, OfferTier::TooHigh);
        assert_eq!(feedback.tone, Tone::Red);
    }

    #[test]
    fn far_below_is_too_low() {
        assert_eq!(tier(40.0, 100.0), Some(OfferTier::TooLow));
        assert_eq!(tier(0.0, 100.0), Some(OfferTier::TooLow));
    }

    #[test]
    fn bands_between_good_and_alerts() {
        assert_eq!(tier(120.0, 100.0), Some(OfferTier::Fair));
        assert_eq!(tier(80.0, 100.0), Some(OfferTier::Fair));
        assert_eq!(tier(145.0, 100.0), Some(OfferTier::Normal));
        assert_eq!(tier(55.0, 100.0), Some(OfferTier::Normal));
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(tier(110.0, 100.0), Some(OfferTier::Good));
        assert_eq!(tier(135.0, 100.0), Some(OfferTier::Fair));
        assert_eq!(tier(150.0, 100.0), Some(OfferTier::Normal));
        assert_eq!(tier(50.0, 100.0), Some(OfferTier::Normal));
    }

    #[test]
    fn good_and_fair_bands_are_symmetric() {
        for x in [0.0, 2.5, 7.0, 10.0, 12.0, 20.0, 35.0] {
            assert_eq!(tier(100.0 + x, 100.0), tier(100.0 - x, 100.0), "x = {}", x);
        }
    }

    #[test]
    fn no_feedback_without_estimate() {
        assert_eq!(evaluate(100.0, 0.0, &thresholds()), None);
        assert_eq!(evaluate(100.0, -5.0, &thresholds()), None);
        assert_eq!(evaluate(100.0, f64::NAN, &thresholds()), None);
        assert_eq!(evaluate(f64::INFINITY, 100.0, &thresholds()), None);
    }
}
