//! HTTP server configuration and request routing.
//!
//! Provides Axum server setup with middleware stack, graceful shutdown,
//! and connection pooling integration for the sale ingestion endpoint.
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Panic recovery
//! 4. Timeout enforcement (30s default)
//! 5. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server handles SIGTERM gracefully:
//! - Stops accepting new connections
//! - Waits for in-flight requests (30s max)
//! - Closes database connections
//! - Returns appropriate exit code

use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{error::IngestError, handlers, store::SaleStore};
use vendhook_core::Clock;

/// Default time budget for a single request, handler included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence seam for sale records.
    pub store: Arc<dyn SaleStore>,
    /// Clock used for receipt timestamps and health probes.
    pub clock: Arc<dyn Clock>,
    webhook_secret: Arc<str>,
}

impl AppState {
    /// Creates application state from its three dependencies.
    pub fn new(
        store: Arc<dyn SaleStore>,
        clock: Arc<dyn Clock>,
        webhook_secret: impl Into<Arc<str>>,
    ) -> Self {
        Self { store, clock, webhook_secret: webhook_secret.into() }
    }

    /// Shared secret that ingest requests must present.
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// Sets up:
/// - The sale ingestion endpoint and health probes
/// - Request tracing and logging
/// - Panic recovery mapped to a 500 response
/// - Timeout handling ([`DEFAULT_REQUEST_TIMEOUT`])
/// - Shared application state
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use sqlx::PgPool;
/// use vendhook_api::{
///     server::{create_router, AppState},
///     store::PostgresSaleStore,
/// };
/// use vendhook_core::{storage::Storage, RealClock};
///
/// async fn start(db: PgPool) {
///     let store = Arc::new(PostgresSaleStore::new(Arc::new(Storage::new(db))));
///     let state = AppState::new(store, Arc::new(RealClock::new()), "secret");
///     let app = create_router(state);
///     // Serve the app...
/// }
/// ```
pub fn create_router(state: AppState) -> Router {
    router_with_timeout(state, DEFAULT_REQUEST_TIMEOUT)
}

fn router_with_timeout(state: AppState, request_timeout: Duration) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check));

    // The 405 fallback sits on the method router so unsupported methods are
    // rejected before the handler's secret check runs.
    let ingest_routes = Router::new()
        .route("/", post(handlers::ingest_sale).fallback(handlers::method_not_allowed));

    Router::new()
        .merge(health_routes)
        .merge(ingest_routes)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Converts a handler panic into the catch-all 500 response.
///
/// The panic payload is logged but never echoed to the client.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!("Request handler panicked: {detail}");

    IngestError::Internal.into_response()
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Binds to the specified address and serves requests until shutdown
/// signal received. Handles graceful shutdown with timeout.
///
/// # Errors
///
/// Returns `std::io::Error` if:
/// - Port is already in use
/// - Network interface unavailable
///
/// # Example
///
/// ```no_run
/// use std::{net::SocketAddr, sync::Arc, time::Duration};
///
/// use sqlx::PgPool;
/// use vendhook_api::{
///     server::{start_server, AppState},
///     store::PostgresSaleStore,
/// };
/// use vendhook_core::{storage::Storage, RealClock};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = PgPool::connect("postgresql://...").await?;
///     let store = Arc::new(PostgresSaleStore::new(Arc::new(Storage::new(db))));
///     let state = AppState::new(store, Arc::new(RealClock::new()), "secret");
///     let addr: SocketAddr = "127.0.0.1:8080".parse()?;
///
///     start_server(state, addr, Duration::from_secs(30)).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    request_timeout: Duration,
) -> Result<(), std::io::Error> {
    let app = router_with_timeout(state, request_timeout);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
///
/// Enables graceful shutdown on:
/// - CTRL+C (SIGINT) - Development
/// - SIGTERM - Kubernetes/Docker
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting up to 30 seconds for in-flight requests to complete");
}
