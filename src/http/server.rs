//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that sends every path to the relay
//! - Wire up middleware (tracing)
//! - Serve plain TCP or TLS with graceful shutdown
//! - Log each relay outcome with its request ID

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::http::request::request_id;
use crate::lifecycle::signals::shutdown_signal;
use crate::relay::Relay;

/// How long in-flight requests may drain after shutdown on the TLS path.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

/// HTTP server fronting the relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let state = AppState {
            relay: Relay::from_config(&config)?,
        };

        let router = Self::build_router(state);
        Ok(Self { router })
    }

    /// Every path, including `/`, goes to the relay. Paths are not cleaned:
    /// collapsing `//` or `..` would corrupt the embedded target URL.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler))
            .route("/", any(relay_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
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
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = shutdown.recv() => {}
            }
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Relay handler for every inbound path.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let span = tracing::info_span!(
        "relay",
        request_id = %request_id,
        method = %request.method(),
    );

    match state.relay.handle(request).instrument(span).await {
        Ok(response) => {
            tracing::debug!(
                request_id = %request_id,
                status = response.status().as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Relayed"
            );
            response
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(request_id = %request_id, status = status.as_u16(), error = ?err, "Relay failed");
            } else {
                tracing::warn!(request_id = %request_id, status = status.as_u16(), error = %err, "Rejected request");
            }
            err.into_response()
        }
    }
}
