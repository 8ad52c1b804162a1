//! RFPDesk API Gateway
//!
//! The single HTTP entry point for the Q/A service. Handles:
//! - Request routing for search, chat, and corpus management
//! - Observability (logging, metrics, tracing)
//!
//! All retrieval logic lives in `rfpdesk-retrieval`; handlers here are thin
//! request/response adapters.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use rfpdesk_common::{config::AppConfig, metrics};
use rfpdesk_retrieval::{source_from_config, CorpusStore, QaService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<QaService>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting RFPDesk API Gateway v{}", rfpdesk_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from((
                [0, 0, 0, 0],
                config.observability.metrics_port,
            )))
            .install()?;
        info!(port = config.observability.metrics_port, "Metrics exporter started");
    }

    // Wire up the retrieval pipeline
    let store = Arc::new(CorpusStore::new());
    let source = source_from_config(&config.corpus)?;
    let embedder = rfpdesk_common::embeddings::create_embedder(&config.embedding)?;
    let completer = rfpdesk_common::completion::create_completer(&config.completion)?;

    // Eager corpus load; a failure here is not fatal, the first query will
    // retry through the same single-flight guard
    if config.corpus.preload {
        match store.get_or_load(&*source).await {
            Ok(corpus) => info!(records = corpus.len(), "Corpus preloaded"),
            Err(e) => warn!(error = %e, "Corpus preload failed, will retry on first query"),
        }
    }

    let service = Arc::new(QaService::new(
        store,
        source,
        embedder,
        completer,
        config.ranking.clone(),
    ));

    // Create app state
    let state = AppState {
        config: config.clone(),
        service,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Query endpoints
        .route("/search", post(handlers::query::search))
        .route("/chat", post(handlers::query::chat))
        // Corpus management
        .route("/corpus/reload", post(handlers::corpus::reload));

    // Compose the app
    Router::new()
        // Health endpoints (outside the API prefix)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
