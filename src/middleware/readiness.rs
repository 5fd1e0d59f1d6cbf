use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::handlers::AppError;
use crate::services::{AppState, ServiceState};

/// Gate for routes that need the trained model. Answers 503 with
/// `Retry-After` until the service is READY, otherwise hands the scoring
/// context to the handler as a request extension.
pub async fn require_ready(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.scoring() {
        Some(scoring) if state.service_state() != ServiceState::Shutdown => {
            request.extensions_mut().insert(scoring);
            next.run(request).await
        }
        _ => AppError::NotReady {
            retry_after_secs: state.config.retry_after_secs,
        }
        .into_response(),
    }
}
