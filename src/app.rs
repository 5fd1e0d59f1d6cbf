use anyhow::Context;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::middleware::readiness;
use crate::services::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let scoring_routes = Router::new()
        .route("/predict-delay", post(handlers::predict::predict_delay))
        .route("/predict-delay/batch", post(handlers::predict::predict_batch))
        .route("/model/info", get(handlers::model::model_info))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            readiness::require_ready,
        ));

    Router::new()
        .merge(scoring_routes)
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until a shutdown signal arrives or initialization fails.
///
/// The listener is bound before the model is ready; initialization runs in
/// the background and scoring routes answer 503 until it completes.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config));
    let addr = state.config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(
        %addr,
        model_dir = %state.config.model_dir.display(),
        "Starting delay scoring service"
    );

    let shutdown = CancellationToken::new();
    let init = {
        let state = Arc::clone(&state);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = state.initialize().await.map(|_| ());
            if let Err(err) = &result {
                tracing::error!(error = %err, "Initialization failed, refusing to serve");
                shutdown.cancel();
            }
            result
        })
    };

    let app = create_router(Arc::clone(&state));
    let draining = {
        let state = Arc::clone(&state);
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal(shutdown).await;
            state.mark_shutdown();
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(draining)
        .await
        .context("server error")?;

    // init only cancels the token on failure, and returns right after
    if shutdown.is_cancelled() || init.is_finished() {
        init.await.context("initialization task panicked")??;
    } else {
        init.abort();
    }

    tracing::info!("Server stopped");
    Ok(())
}

pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
