use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::features::FEATURE_NAMES;
use crate::services::ScoringService;
use crate::storage::SCHEMA_VERSION;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub schema_version: u32,
    pub n_estimators: usize,
    pub training_rows: usize,
    pub seed: u64,
    pub trained_at: DateTime<Utc>,
    pub features: Vec<String>,
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    pub statuses: Vec<String>,
}

pub async fn model_info(Extension(scoring): Extension<Arc<ScoringService>>) -> Json<ModelInfo> {
    let bundle = scoring.bundle();
    Json(ModelInfo {
        schema_version: SCHEMA_VERSION,
        n_estimators: bundle.model.n_estimators(),
        training_rows: bundle.model.training_rows(),
        seed: bundle.metadata.seed,
        trained_at: bundle.metadata.trained_at,
        features: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
        origins: bundle.encoders.origin.classes().to_vec(),
        destinations: bundle.encoders.destination.classes().to_vec(),
        statuses: bundle.encoders.status.classes().to_vec(),
    })
}
