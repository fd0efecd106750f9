//! Orchard Orders - order management service.
//!
//! This binary serves the order management API on port 3200 by default.
//!
//! # Architecture
//!
//! - Axum web framework with JSON request/response bodies
//! - File-backed JSON collections (orders, carts, products, payments)
//! - Bearer-token authentication reconciled against the remote identity
//!   service, with a local fallback when that service is unreachable

#![cfg_attr(not(test), forbid(unsafe_code))]

use tower_http::trace::TraceLayer;

use orchard_orders::config::OrdersConfig;
use orchard_orders::routes;
use orchard_orders::state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = OrdersConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orchard_orders=info,tower_http=debug".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Build application state and ensure the collection files exist
    let state = AppState::new(config.clone());
    state
        .init_stores()
        .await
        .expect("Failed to initialize data stores");
    tracing::info!(data_dir = %config.data_dir.display(), "data stores ready");

    // Build router
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("orders service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
