//! Read-only HTTP view of a node: its queue and its registry.

use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::peers::{PeerRegistry, PeerStatus};
use crate::scheduler::{WorkItem, WorkQueue};

#[derive(Clone)]
pub struct StatusState {
    pub node_addr: SocketAddr,
    pub started_at: DateTime<Utc>,
    pub queue: WorkQueue,
    pub registry: PeerRegistry,
}

#[derive(Debug, Serialize)]
pub struct NodeStatusResponse {
    pub node_addr: SocketAddr,
    pub started_at: DateTime<Utc>,
    pub queue_length: usize,
    pub peer_count: usize,
}

pub fn router(state: StatusState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(node_status_handler))
        .route("/api/peers", get(peers_handler))
        .route("/api/queue", get(queue_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn run_status_server(addr: SocketAddr, state: StatusState, shutdown: CancellationToken) {
    tracing::info!(addr = %addr, "Starting status server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind status server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "Status server failed");
    }
}

async fn node_status_handler(State(state): State<StatusState>) -> Json<NodeStatusResponse> {
    Json(NodeStatusResponse {
        node_addr: state.node_addr,
        started_at: state.started_at,
        queue_length: state.queue.len().await,
        peer_count: state.registry.len().await,
    })
}

async fn peers_handler(State(state): State<StatusState>) -> Json<Vec<PeerStatus>> {
    Json(state.registry.snapshot().await)
}

async fn queue_handler(State(state): State<StatusState>) -> Json<Vec<WorkItem>> {
    Json(state.queue.snapshot().await)
}
