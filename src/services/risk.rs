use crate::models::RiskLevel;

/// Delay at which the normalised probability saturates at 1.0.
pub const PROBABILITY_CEILING_HOURS: f64 = 48.0;
pub const MEDIUM_RISK_HOURS: f64 = 6.0;
pub const HIGH_RISK_HOURS: f64 = 24.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiskAssessment {
    pub delay_probability: f64,
    pub risk_level: RiskLevel,
}

/// Map a predicted delay to its normalised probability and risk tier.
///
/// The probability is a linear scale against a 48 hour ceiling, not a
/// calibrated probability. Tier bounds are inclusive at the bottom: 6.0 is
/// MEDIUM and 24.0 is HIGH. A non-finite delay yields UNKNOWN.
pub fn classify(delay_hours: f64) -> RiskAssessment {
    if !delay_hours.is_finite() {
        return RiskAssessment {
            delay_probability: 0.0,
            risk_level: RiskLevel::Unknown,
        };
    }

    let probability = (delay_hours / PROBABILITY_CEILING_HOURS).clamp(0.0, 1.0);
    RiskAssessment {
        delay_probability: round2(probability),
        risk_level: risk_level(delay_hours),
    }
}

pub fn risk_level(delay_hours: f64) -> RiskLevel {
    if delay_hours.is_nan() {
        RiskLevel::Unknown
    } else if delay_hours < MEDIUM_RISK_HOURS {
        RiskLevel::Low
    } else if delay_hours < HIGH_RISK_HOURS {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
