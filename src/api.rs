use anyhow::{Context, Result};
use axum::extract::State;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::store::StatusStore;

/// Everything the status endpoint needs: where to look and what to call it.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn StatusStore>,
    pub host: String,
    pub key: String,
}

/// Render the last persisted classification as plain text. Absence of a
/// record (or a store hiccup) reads as "unknown"; this endpoint answers 200
/// no matter what.
pub async fn get_status(State(state): State<ApiState>) -> String {
    let tag = match state.store.get(&state.key).await {
        Ok(Some(tag)) => tag,
        Ok(None) => "unknown".to_string(),
        Err(err) => {
            warn!("status read failed: {err:#}");
            "unknown".to_string()
        }
    };
    format!("{} is {}", state.host, tag)
}

/// Every path and method lands on the status handler.
pub fn create_router(state: ApiState) -> Router {
    Router::new().fallback(get_status).with_state(state)
}

pub async fn start_server(port: u16, state: ApiState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status port {port}"))?;
    info!("status endpoint: http://localhost:{}", addr.port());
    serve(listener, state).await
}

pub async fn serve(listener: TcpListener, state: ApiState) -> Result<()> {
    axum::serve(listener, create_router(state))
        .await
        .context("status server exited")
}
