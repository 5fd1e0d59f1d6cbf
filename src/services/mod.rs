pub mod bundle;
pub mod encoder;
pub mod features;
pub mod forest;
pub mod lifecycle;
pub mod risk;
pub mod scoring;
pub mod synthesizer;

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::storage::ModelStore;

pub use bundle::ModelBundle;
pub use lifecycle::{InitError, ServiceState};
pub use scoring::{ScoringFault, ScoringService};

pub struct AppState {
    pub config: Config,
    pub store: Arc<ModelStore>,
    state: RwLock<ServiceState>,
    scoring: OnceCell<Arc<ScoringService>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(ModelStore::new(&config.model_dir));
        Self {
            config,
            store,
            state: RwLock::new(ServiceState::Uninitialized),
            scoring: OnceCell::new(),
        }
    }

    /// Bring the scoring context up. Runs the load-or-train sequence at most
    /// once; concurrent callers wait for the same attempt.
    pub async fn initialize(&self) -> Result<Arc<ScoringService>, InitError> {
        let scoring = self
            .scoring
            .get_or_try_init(|| async {
                if !self.transition(ServiceState::Initializing) {
                    return Err(InitError::ShuttingDown);
                }

                let store = Arc::clone(&self.store);
                let training = self.config.training;
                let outcome = tokio::task::spawn_blocking(move || {
                    lifecycle::bootstrap(&store, &training)
                })
                .await
                .map_err(|e| InitError::Worker(e.to_string()))
                .and_then(|result| result);

                match outcome {
                    Ok(bundle) => Ok(Arc::new(ScoringService::new(bundle))),
                    Err(err) => {
                        self.transition(ServiceState::Uninitialized);
                        Err(err)
                    }
                }
            })
            .await?;

        self.transition(ServiceState::Ready);
        Ok(Arc::clone(scoring))
    }

    /// The scoring context, once initialization has completed.
    pub fn scoring(&self) -> Option<Arc<ScoringService>> {
        self.scoring.get().cloned()
    }

    pub fn service_state(&self) -> ServiceState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.service_state() == ServiceState::Ready && self.scoring.initialized()
    }

    pub fn mark_shutdown(&self) {
        self.transition(ServiceState::Shutdown);
    }

    fn transition(&self, next: ServiceState) -> bool {
        let mut state = self.state.write();
        if *state == next {
            return true;
        }
        if !state.can_transition_to(next) {
            return false;
        }
        let previous = *state;
        *state = next;
        tracing::info!(from = %previous, to = %next, "Service state changed");
        true
    }
}
