//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy mount and health route
//! - Wire up middleware (tracing, body limit, request ID)
//! - Bound in-flight requests
//! - Bind server to a plain or TLS listener
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::proxy::Gateway;

/// How long TLS connections get to finish after shutdown is signalled.
const TLS_DRAIN_SECS: u64 = 30;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub limit: Arc<Semaphore>,
}

/// HTTP server for the storefront gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: Arc<ProxyConfig>) -> Result<Self, reqwest::Error> {
        let state = AppState {
            gateway: Gateway::new(config.clone())?,
            limit: Arc::new(Semaphore::new(config.listener.max_in_flight)),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mount = config.proxy.mount_path.trim_end_matches('/');

        Router::new()
            .route(mount, proxy_methods())
            .route(&format!("{mount}/{{*path}}"), proxy_methods())
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend_base = %self.config.backend.base(),
            mount_path = %self.config.proxy.mount_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %addr,
            backend_base = %self.config.backend.base(),
            mount_path = %self.config.proxy.mount_path,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining");
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

fn proxy_methods() -> MethodRouter<AppState> {
    get(proxy_handler)
        .post(proxy_handler)
        .put(proxy_handler)
        .patch(proxy_handler)
        .delete(proxy_handler)
}

/// Main proxy handler. Holds a permit for the lifetime of the relay.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let _permit = match state.limit.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "In-flight limit reached, shedding request");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "message": "Gateway is at capacity" })),
            )
                .into_response();
        }
    };

    state.gateway.handle(request).await
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
