use serde::{Deserialize, Serialize};

/// One labelled example of the training corpus, before categorical encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub origin: String,
    pub destination: String,
    pub supplier_id: u32,
    pub estimated_days: u32,
    pub status: String,
    pub distance_km: f64,
    pub delay_hours: f64,
}
