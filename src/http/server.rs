//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the relay and liveness handlers
//! - Wire up middleware (tracing, request ID)
//!
//! No inbound timeout layer: the outbound client owns timeouts, so an expiry
//! comes back as a `Timeout` failure.
//! - Bind server to listener
//! - Hand each relay request to [`relay`] with a fresh set of locals

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::http::request::{request_id_middleware, RequestIdExt};
use crate::observability::metrics;
use crate::relay::{relay, Executor, InboundRequest, RelayResponse, RelaySettings, ReqwestExecutor};

/// Application state injected into handlers.
///
/// Holds only immutable, shareable pieces; per-request state lives on the
/// handler's stack.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn Executor>,
    pub settings: RelaySettings,
    pub max_request_body: usize,
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
}

impl RelayServer {
    /// Create a server that relays through a `reqwest` client.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let executor = ReqwestExecutor::new(&config.timeouts)?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    /// Create a server around any [`Executor`].
    pub fn with_executor(config: RelayConfig, executor: Arc<dyn Executor>) -> Self {
        let state = AppState {
            executor,
            settings: config.relay.settings(),
            max_request_body: config.relay.max_request_body,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let base = config.relay.path.trim_end_matches('/');
        let nested = format!("{}/{{*rest}}", base);
        let root = if base.is_empty() { "/" } else { base };

        Router::new()
            .route("/healthz", get(health_handler))
            .route(root, any(relay_handler))
            .route(&nested, any(relay_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(request_id_middleware)),
            )
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.relay.path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Relay handler. Accepts any method on the relay path.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_id = request
        .request_id()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());

    let response = match InboundRequest::from_request(request, state.max_request_body).await {
        Ok(inbound) => relay(state.executor.as_ref(), inbound, &state.settings).await,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting inbound request");
            RelayResponse::from(e)
        }
    };

    let status = response.status();
    tracing::info!(
        request_id = %request_id,
        method = %method,
        status = status.as_u16(),
        outcome = response.outcome(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Relay finished"
    );
    metrics::record_request(method.as_str(), status.as_u16(), response.outcome(), start_time);

    response.into_response()
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
