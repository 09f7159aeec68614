//! `NodeServer`: axum router, listener, and relay wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use ::metrics::counter;
use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use comms_messenger::Messenger;
use comms_settings::{CommsSettings, NodeSettings};
use comms_socket::{Bootstrap, ShutdownCoordinator, SocketPolicy};

use crate::envelope::Envelope;
use crate::health::{self, HealthResponse};
use crate::metrics::CONNECTIONS_REJECTED_TOTAL;
use crate::relay;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Builds sessions with the configured policy and shared interrupt.
    pub bootstrap: Bootstrap,
    /// Routes envelopes between relay sessions.
    pub messenger: Messenger<Envelope>,
    /// Live relay session count.
    pub connections: Arc<AtomicUsize>,
    /// Session limit.
    pub max_connections: usize,
    /// When the node started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The relay node.
pub struct NodeServer {
    settings: NodeSettings,
    state: AppState,
    shutdown: ShutdownCoordinator,
    messenger_task: JoinHandle<()>,
}

impl NodeServer {
    /// Create a node and spawn its messenger. Must run inside a Tokio runtime.
    pub fn new(
        settings: &CommsSettings,
        shutdown: ShutdownCoordinator,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let bootstrap = Bootstrap::new(SocketPolicy::from_settings(&settings.socket))
            .with_interrupt(shutdown.token());
        let (messenger, messenger_task) = Messenger::spawn(&settings.messenger, shutdown.token());
        let state = AppState {
            bootstrap,
            messenger,
            connections: Arc::new(AtomicUsize::new(0)),
            max_connections: settings.node.max_connections,
            start_time: Instant::now(),
            metrics,
        };
        Self {
            settings: settings.node.clone(),
            state,
            shutdown,
            messenger_task,
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Shutdown coordinator shared by the listener, messenger and sessions.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Bind the configured address and start serving.
    pub async fn listen(self) -> std::io::Result<RunningNode> {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let token = self.shutdown.token();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        });
        info!(addr = %local_addr, "comms node listening");

        Ok(RunningNode {
            addr: local_addr,
            server,
            messenger_task: self.messenger_task,
            shutdown: self.shutdown,
        })
    }
}

/// Handle to a listening node.
pub struct RunningNode {
    addr: SocketAddr,
    server: JoinHandle<std::io::Result<()>>,
    messenger_task: JoinHandle<()>,
    shutdown: ShutdownCoordinator,
}

impl RunningNode {
    /// Bound address (resolves port `0`).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Fire the shared interrupt.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Wait for the listener to stop, then give the messenger `grace` to
    /// drain.
    pub async fn wait(self, grace: Duration) -> anyhow::Result<()> {
        let served = self.server.await;
        self.shutdown
            .graceful_shutdown(vec![self.messenger_task], Some(grace))
            .await;
        served??;
        Ok(())
    }
}

/// Decrements the live session count when the upgraded connection ends, or
/// when the upgrade never happens.
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// GET /ws
async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let current = state.connections.fetch_add(1, Ordering::AcqRel);
    let slot = ConnectionSlot(state.connections.clone());
    if current >= state.max_connections {
        drop(slot);
        counter!(CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(%peer, limit = state.max_connections, "connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let messenger = state.messenger.clone();
    state
        .bootstrap
        .accept_upgrade(ws, peer.to_string(), move |session| async move {
            let _slot = slot;
            relay::serve_session(session, messenger).await;
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.connections.load(Ordering::Acquire);
    Json(health::health_check(
        state.start_time,
        connections,
        state.max_connections,
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    crate::metrics::render(state.metrics.as_ref())
}
