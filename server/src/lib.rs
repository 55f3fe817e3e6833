//! In-process WebHDFS emulator.
//!
//! Serves the NameNode REST surface under `/webhdfs/v1` and a DataNode
//! surface under `/datanode/v1` from one listener, backed by an in-memory
//! [`namespace::Namespace`]. Used by the client integration tests and for
//! local experiments with the `webhdfs` CLI.

pub mod handlers;
pub mod namespace;

use axum::{Router, routing::any};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use namespace::Namespace;

pub const NAMENODE_PREFIX: &str = "/webhdfs/v1";
pub const DATANODE_PREFIX: &str = "/datanode/v1";

#[derive(Clone, Default)]
pub struct AppState {
    pub namespace: Arc<RwLock<Namespace>>,
    /// Reject requests without `user.name` with `401`.
    pub require_user: bool,
}

impl AppState {
    pub fn new(require_user: bool) -> Self {
        Self {
            namespace: Arc::new(RwLock::new(Namespace::new())),
            require_user,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/webhdfs/v1", any(handlers::namenode))
        .route("/webhdfs/v1/", any(handlers::namenode))
        .route("/webhdfs/v1/*path", any(handlers::namenode))
        .route("/datanode/v1/*path", any(handlers::datanode))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves the emulator on a background task.
///
/// Returns the bound address, which matters when `addr` asks for port 0.
pub async fn spawn(addr: SocketAddr, state: AppState) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::debug!("listening on {}", local);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app(state)).await {
            tracing::error!("emulator stopped: {}", e);
        }
    });
    Ok((local, handle))
}
