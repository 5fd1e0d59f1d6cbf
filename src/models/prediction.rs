use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub delay_hours: f64,
    pub delay_probability: f64,
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Answer returned when scoring failed: zeroed numbers, UNKNOWN tier.
    pub fn degraded() -> Self {
        Self {
            delay_hours: 0.0,
            delay_probability: 0.0,
            risk_level: RiskLevel::Unknown,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.risk_level == RiskLevel::Unknown
    }
}
