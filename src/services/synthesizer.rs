//! Synthetic training corpus used to bootstrap a model when nothing has been
//! persisted yet.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::TrainingConfig;
use crate::models::TrainingRow;

pub const CITIES: [&str; 5] = ["Mumbai", "Delhi", "Bangalore", "Chennai", "Kolkata"];
pub const STATUSES: [&str; 4] = ["in_transit", "customs", "processing", "shipped"];

pub const CUSTOMS_HOLD_HOURS: f64 = 24.0;
pub const POOR_SUPPLIER_HOURS: f64 = 12.0;
/// Suppliers with an id above this are treated as unreliable.
pub const POOR_SUPPLIER_THRESHOLD: u32 = 15;
pub const NOISE_STDDEV_HOURS: f64 = 12.0;

pub struct DataSynthesizer {
    seed: u64,
    samples: usize,
}

impl DataSynthesizer {
    pub fn new(seed: u64, samples: usize) -> Self {
        Self { seed, samples }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.seed, config.samples)
    }

    pub fn generate(&self) -> Vec<TrainingRow> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.samples).map(|_| Self::draw_row(&mut rng)).collect()
    }

    fn draw_row(rng: &mut StdRng) -> TrainingRow {
        let origin = CITIES[rng.gen_range(0..CITIES.len())];
        let destination = CITIES[rng.gen_range(0..CITIES.len())];
        let supplier_id: u32 = rng.gen_range(1..20);
        let estimated_days: u32 = rng.gen_range(1..15);
        let status = STATUSES[rng.gen_range(0..STATUSES.len())];
        let distance_km: f64 = rng.gen_range(100.0..2000.0);

        let noise: f64 = rng.sample::<f64, _>(StandardNormal) * NOISE_STDDEV_HOURS;
        let base = expected_delay_hours(distance_km, estimated_days, status, supplier_id);

        TrainingRow {
            origin: origin.to_string(),
            destination: destination.to_string(),
            supplier_id,
            estimated_days,
            status: status.to_string(),
            distance_km,
            delay_hours: (base + noise).max(0.0),
        }
    }
}

/// Noise-free delay prior the corpus is generated from.
pub fn expected_delay_hours(
    distance_km: f64,
    estimated_days: u32,
    status: &str,
    supplier_id: u32,
) -> f64 {
    let mut base = distance_km / 100.0 + f64::from(estimated_days) * 0.5;
    if status == "customs" {
        base += CUSTOMS_HOLD_HOURS;
    }
    if supplier_id > POOR_SUPPLIER_THRESHOLD {
        base += POOR_SUPPLIER_HOURS;
    }
    base
}
