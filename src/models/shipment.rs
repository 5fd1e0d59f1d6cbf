use serde::{Deserialize, Serialize};

pub const DEFAULT_DISTANCE_KM: f64 = 1000.0;

/// Lifecycle states for which the batch endpoint does not score.
pub const CLOSED_STATUSES: &[&str] = &["delivered", "cancelled"];

fn default_distance_km() -> f64 {
    DEFAULT_DISTANCE_KM
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub origin: String,
    pub destination: String,
    pub supplier_id: u32,
    pub estimated_days: u32,
    pub current_status: String,
    #[serde(default = "default_distance_km")]
    pub distance_km: f64,
}

impl ShipmentRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.supplier_id == 0 {
            return Err("supplier_id must be at least 1".to_string());
        }
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(format!(
                "distance_km must be a non-negative number, got {}",
                self.distance_km
            ));
        }
        Ok(())
    }
}

/// Batch item as sent by the dashboard: the scoring fields plus the
/// shipment id and its platform lifecycle status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchShipment {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub record: ShipmentRecord,
}

impl BatchShipment {
    pub fn is_closed(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| CLOSED_STATUSES.iter().any(|closed| s.eq_ignore_ascii_case(closed)))
            .unwrap_or(false)
    }
}
