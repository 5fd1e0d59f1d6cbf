use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AppError;
use crate::models::{BatchShipment, PredictionResult, ShipmentRecord};
use crate::services::ScoringService;

pub const MAX_BATCH_SIZE: usize = 1000;

pub async fn predict_delay(
    Extension(scoring): Extension<Arc<ScoringService>>,
    Json(record): Json<ShipmentRecord>,
) -> Result<Json<PredictionResult>, AppError> {
    record.validate().map_err(AppError::Validation)?;
    Ok(Json(scoring.score_or_degraded(&record)))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub shipments: Vec<BatchShipment>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    pub predictions: BTreeMap<String, PredictionResult>,
    /// Delivered or cancelled shipments, which are not scored.
    pub skipped: Vec<String>,
    /// Items that failed validation, with the reason.
    pub rejected: BTreeMap<String, String>,
}

pub async fn predict_batch(
    Extension(scoring): Extension<Arc<ScoringService>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    if request.shipments.len() > MAX_BATCH_SIZE {
        return Err(AppError::Validation(format!(
            "batch holds {} shipments, limit is {}",
            request.shipments.len(),
            MAX_BATCH_SIZE
        )));
    }

    let mut response = BatchResponse::default();
    for item in request.shipments {
        if item.is_closed() {
            response.skipped.push(item.id);
            continue;
        }
        match item.record.validate() {
            Ok(()) => {
                let prediction = scoring.score_or_degraded(&item.record);
                response.predictions.insert(item.id, prediction);
            }
            Err(reason) => {
                response.rejected.insert(item.id, reason);
            }
        }
    }

    tracing::debug!(
        scored = response.predictions.len(),
        skipped = response.skipped.len(),
        rejected = response.rejected.len(),
        "Scored batch"
    );
    Ok(Json(response))
}
