pub mod prediction;
pub mod shipment;
pub mod training;

pub use prediction::{PredictionResult, RiskLevel};
pub use shipment::{BatchShipment, ShipmentRecord};
pub use training::TrainingRow;
