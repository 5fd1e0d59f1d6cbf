use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use super::bundle::ModelBundle;
use super::forest::ModelError;
use super::risk::{classify, round2};
use crate::models::{PredictionResult, ShipmentRecord};

#[derive(Error, Debug)]
pub enum ScoringFault {
    #[error("model rejected request: {0}")]
    Model(#[from] ModelError),
    #[error("model produced a negative delay estimate ({0})")]
    NegativeEstimate(f64),
    #[error("scoring panicked: {0}")]
    Panicked(String),
}

/// Per-request scoring over an immutable [`ModelBundle`].
#[derive(Debug)]
pub struct ScoringService {
    bundle: ModelBundle,
    faults: AtomicU64,
}

impl ScoringService {
    pub fn new(bundle: ModelBundle) -> Self {
        Self {
            bundle,
            faults: AtomicU64::new(0),
        }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Encode, predict and classify one shipment.
    pub fn score(&self, record: &ShipmentRecord) -> Result<PredictionResult, ScoringFault> {
        let features = self.bundle.encoders.encode_record(record);
        let estimate = self.bundle.model.predict(&features)?;
        if estimate < 0.0 {
            return Err(ScoringFault::NegativeEstimate(estimate));
        }

        let delay_hours = round2(estimate);
        let assessment = classify(delay_hours);
        Ok(PredictionResult {
            delay_hours,
            delay_probability: assessment.delay_probability,
            risk_level: assessment.risk_level,
        })
    }

    /// Always answers: a fault is logged, counted and turned into the
    /// degraded UNKNOWN result.
    pub fn score_or_degraded(&self, record: &ShipmentRecord) -> PredictionResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.score(record)))
            .unwrap_or_else(|payload| Err(ScoringFault::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(result) => result,
            Err(fault) => {
                let total = self.faults.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    error = %fault,
                    origin = %record.origin,
                    destination = %record.destination,
                    status = %record.current_status,
                    faults_total = total,
                    "Scoring fault, answering with degraded prediction"
                );
                PredictionResult::degraded()
            }
        }
    }

    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
