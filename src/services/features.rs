//! Feature vector layout shared by training and inference.

use super::encoder::FeatureEncoders;
use crate::models::{ShipmentRecord, TrainingRow};

pub const FEATURE_COUNT: usize = 6;

/// Column order of every feature vector. Training and inference must agree.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "origin",
    "destination",
    "supplier_id",
    "estimated_days",
    "status",
    "distance_km",
];

pub type FeatureVector = [f64; FEATURE_COUNT];

impl FeatureEncoders {
    pub fn encode_record(&self, record: &ShipmentRecord) -> FeatureVector {
        [
            f64::from(self.origin.transform(&record.origin)),
            f64::from(self.destination.transform(&record.destination)),
            f64::from(record.supplier_id),
            f64::from(record.estimated_days),
            f64::from(self.status.transform(&record.current_status)),
            record.distance_km,
        ]
    }

    pub fn encode_row(&self, row: &TrainingRow) -> FeatureVector {
        [
            f64::from(self.origin.transform(&row.origin)),
            f64::from(self.destination.transform(&row.destination)),
            f64::from(row.supplier_id),
            f64::from(row.estimated_days),
            f64::from(self.status.transform(&row.status)),
            row.distance_km,
        ]
    }

    /// Encode a corpus into the (features, targets) pair the model trains on.
    pub fn training_matrix(&self, rows: &[TrainingRow]) -> (Vec<FeatureVector>, Vec<f64>) {
        rows.iter()
            .map(|row| (self.encode_row(row), row.delay_hours))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<TrainingRow> {
        vec![TrainingRow {
            origin: "Mumbai".into(),
            destination: "Delhi".into(),
            supplier_id: 5,
            estimated_days: 3,
            status: "in_transit".into(),
            distance_km: 1000.0,
            delay_hours: 14.5,
        }]
    }

    #[test]
    fn test_record_and_row_encode_identically() {
        let rows = rows();
        let encoders = FeatureEncoders::fit(&rows);
        let record = ShipmentRecord {
            origin: "Mumbai".into(),
            destination: "Delhi".into(),
            supplier_id: 5,
            estimated_days: 3,
            current_status: "in_transit".into(),
            distance_km: 1000.0,
        };
        assert_eq!(encoders.encode_record(&record), encoders.encode_row(&rows[0]));
    }

    #[test]
    fn test_numeric_fields_pass_through() {
        let encoders = FeatureEncoders::fit(&rows());
        let record = ShipmentRecord {
            origin: "Atlantis".into(),
            destination: "Delhi".into(),
            supplier_id: 19,
            estimated_days: 0,
            current_status: "lost".into(),
            distance_km: 42.5,
        };
        assert_eq!(encoders.encode_record(&record), [0.0, 0.0, 19.0, 0.0, 0.0, 42.5]);
    }

    #[test]
    fn test_training_matrix_pairs_targets() {
        let rows = rows();
        let (features, targets) = FeatureEncoders::fit(&rows).training_matrix(&rows);
        assert_eq!(features.len(), 1);
        assert_eq!(targets, vec![14.5]);
    }
}
