//! Bridge endpoint
//!
//! Binds one HTTP listener carrying the peer WebSocket endpoint and the
//! consumer surface. Admission happens before the upgrade: the `token` query
//! parameter must equal the configured secret. With no secret configured the
//! endpoint is open, which is logged loudly at startup.

use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::capture::MediaCapture;
use crate::error::{BridgeError, Result};
use crate::session::store::SessionStore;

use super::config::BridgeConfig;
use super::connection;
use super::peer::ConnectionManager;

/// Assembled bridge state shared by the endpoint and all handlers.
pub struct Bridge {
    pub config: BridgeConfig,
    pub manager: ConnectionManager,
    pub store: SessionStore,
    pub capture: MediaCapture,
}

impl Bridge {
    /// Wire up every component from one configuration value.
    pub fn new(config: BridgeConfig) -> Arc<Self> {
        let store = SessionStore::new(config.debounce_window);
        let capture = MediaCapture::new(config.capture_dir.clone(), config.capture_queue);
        Arc::new(Self {
            config,
            manager: ConnectionManager::new(),
            store,
            capture,
        })
    }
}

/// Build the router: the peer endpoint plus the consumer surface.
pub fn build_router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .merge(api::routes::router())
        .with_state(bridge)
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves, then tear everything down: the live
/// peer (and with it the heartbeat), the listening endpoint, and the
/// capture sink.
pub async fn run(bridge: Arc<Bridge>, shutdown: impl Future<Output = ()>) -> Result<()> {
    if bridge.config.auth_token.is_none() {
        tracing::warn!("no auth token configured, admitting any client");
    }

    let addr = bridge.config.bind_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind { addr, source })?;
    tracing::info!(addr = %addr, "bridge listening");

    let router = build_router(Arc::clone(&bridge));
    let server = axum::serve(listener, router).into_future();

    tokio::select! {
        result = server => result?,
        _ = shutdown => {
            tracing::info!("shutdown signal received");
        }
    }

    bridge.manager.shutdown();
    bridge.capture.shutdown().await;
    tracing::info!("bridge stopped");
    Ok(())
}

/// Exact-match token admission; open mode when no secret is configured.
fn admit(secret: Option<&str>, token: Option<&str>) -> bool {
    match secret {
        None => true,
        Some(secret) => token == Some(secret),
    }
}

async fn ws_handler(
    State(bridge): State<Arc<Bridge>>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.get("token").map(String::as_str);
    if !admit(bridge.config.auth_token.as_deref(), token) {
        tracing::warn!("connection attempt with bad token refused");
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }
    ws.on_upgrade(move |socket| connection::run_peer(socket, bridge))
        .into_response()
}
