use std::fmt;
use thiserror::Error;

use super::bundle::ModelBundle;
use super::forest::ModelError;
use crate::config::TrainingConfig;
use crate::storage::{ModelStore, StorageError, StorageStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Shutdown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::Initializing => "initializing",
            ServiceState::Ready => "ready",
            ServiceState::Shutdown => "shutdown",
        }
    }

    /// Uninitialized -> Initializing -> Ready, with Initializing falling back
    /// to Uninitialized on failure. Any state may move to Shutdown, which is
    /// terminal.
    pub fn can_transition_to(&self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (*self, next),
            (Uninitialized, Initializing)
                | (Initializing, Ready)
                | (Initializing, Uninitialized)
                | (_, Shutdown)
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InitError {
    #[error("persisted model bundle is unusable; refusing to retrain over it: {0}")]
    CorruptStore(#[source] StorageError),
    #[error("failed to persist trained model bundle: {0}")]
    Persist(#[source] StorageError),
    #[error("training failed: {0}")]
    Training(#[from] ModelError),
    #[error("initialization worker failed: {0}")]
    Worker(String),
    #[error("service is shutting down")]
    ShuttingDown,
}

/// Load the persisted bundle, or train and persist one when the store is
/// empty. A corrupt store is fatal and is never overwritten.
pub fn bootstrap(store: &ModelStore, training: &TrainingConfig) -> Result<ModelBundle, InitError> {
    match store.probe() {
        StorageStatus::Valid(bundle) => {
            tracing::info!(
                dir = %store.dir().display(),
                trees = bundle.model.n_estimators(),
                trained_at = %bundle.metadata.trained_at,
                "Loaded persisted delay model"
            );
            Ok(bundle)
        }
        StorageStatus::Corrupt(err) => {
            tracing::error!(dir = %store.dir().display(), error = %err, "Persisted model bundle is corrupt");
            Err(InitError::CorruptStore(err))
        }
        StorageStatus::Absent => {
            tracing::info!(
                dir = %store.dir().display(),
                samples = training.samples,
                trees = training.trees,
                "No persisted model, training on synthetic corpus"
            );
            let bundle = ModelBundle::train(training)?;
            store.persist(&bundle).map_err(InitError::Persist)?;
            Ok(bundle)
        }
    }
}
