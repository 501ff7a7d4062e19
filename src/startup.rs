//! Application startup and lifecycle management.

use crate::config::AskaiConfig;
use crate::error::AppError;
use crate::handlers;
use crate::services::providers::gemini::GeminiTextProvider;
use crate::services::providers::TextProvider;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Immutable after startup; `provider` is `None`
/// when no upstream credential was configured.
#[derive(Clone)]
pub struct AppState {
    pub config: AskaiConfig,
    pub provider: Option<Arc<dyn TextProvider>>,
}

/// Build the router. CORS is fully permissive: the service is called from
/// statically hosted front ends on arbitrary origins.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ask_ai", post(handlers::ask_ai))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// Starts even without an upstream credential: the service then runs
    /// degraded and the forwarding endpoint fails fast with 503.
    pub async fn build(config: AskaiConfig) -> Result<Self, AppError> {
        let provider: Option<Arc<dyn TextProvider>> = match &config.gemini.api_key {
            Some(api_key) => {
                let provider =
                    GeminiTextProvider::new(api_key.clone(), &config.gemini, config.retry.clone());
                tracing::info!(
                    model = %config.gemini.model,
                    max_attempts = config.retry.max_attempts,
                    "Initialized Gemini text provider"
                );
                Some(Arc::new(provider))
            }
            None => {
                tracing::warn!(
                    "GEMINI_API_KEY is not set; starting degraded, /ask_ai will answer 503"
                );
                None
            }
        };

        // Port 0 = random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state: AppState { config, provider },
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped or a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!("askai-service listening on port {}", self.port);

        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
