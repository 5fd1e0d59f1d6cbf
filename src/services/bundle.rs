use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::encoder::FeatureEncoders;
use super::features::FEATURE_COUNT;
use super::forest::{DelayModel, ForestParams, ModelError};
use super::synthesizer::DataSynthesizer;
use crate::config::TrainingConfig;
use crate::models::TrainingRow;

/// Class counts of the encoders a model was fitted against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub origins: usize,
    pub destinations: usize,
    pub statuses: usize,
}

impl Vocabulary {
    pub fn of(encoders: &FeatureEncoders) -> Self {
        Self {
            origins: encoders.origin.len(),
            destinations: encoders.destination.len(),
            statuses: encoders.status.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub seed: u64,
    pub samples: usize,
    pub vocabulary: Vocabulary,
    pub trained_at: DateTime<Utc>,
}

/// The trained model and the encoders it was trained with. Built once per
/// process and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelBundle {
    pub model: DelayModel,
    pub encoders: FeatureEncoders,
    pub metadata: TrainingMetadata,
}

impl ModelBundle {
    /// Generate the synthetic corpus and fit encoders and model on it.
    pub fn train(config: &TrainingConfig) -> Result<Self, ModelError> {
        let rows = DataSynthesizer::from_config(config).generate();
        let params = ForestParams {
            n_estimators: config.trees,
            seed: config.seed,
            ..ForestParams::default()
        };
        Self::train_on(&rows, params)
    }

    pub fn train_on(rows: &[TrainingRow], params: ForestParams) -> Result<Self, ModelError> {
        let started = Instant::now();
        let encoders = FeatureEncoders::fit(rows);
        let (features, targets) = encoders.training_matrix(rows);
        let model = DelayModel::fit(params, &features, &targets)?;

        tracing::info!(
            rows = rows.len(),
            trees = model.n_estimators(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Trained delay model"
        );

        let vocabulary = Vocabulary::of(&encoders);
        Ok(Self {
            model,
            encoders,
            metadata: TrainingMetadata {
                seed: params.seed,
                samples: rows.len(),
                vocabulary,
                trained_at: Utc::now(),
            },
        })
    }

    /// Reject bundles whose model cannot consume the current feature layout,
    /// or whose encoders are not the ones the model was fitted with.
    pub fn check_compatible(&self) -> Result<(), ModelError> {
        if self.model.n_features() != FEATURE_COUNT {
            return Err(ModelError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: self.model.n_features(),
            });
        }

        let trained = self.metadata.vocabulary;
        let found = Vocabulary::of(&self.encoders);
        for (feature, trained, found) in [
            ("origin", trained.origins, found.origins),
            ("destination", trained.destinations, found.destinations),
            ("status", trained.statuses, found.statuses),
        ] {
            if trained != found {
                return Err(ModelError::EncoderMismatch {
                    feature,
                    trained,
                    found,
                });
            }
        }

        self.model.validate()
    }
}
