//! Downstream consumer surface
//!
//! Read-only resource views over the session snapshot, a few callable
//! actions toward the peer, and one SSE pulse that means "re-read whatever
//! you care about". Missing resources come back as structured `404` bodies,
//! never a crash.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::capture::CaptureStatus;
use crate::protocol::records::{ActorRecord, ChatRecord, CombatRecord, SceneRecord};
use crate::protocol::ServerMessage;
use crate::server::listener::Bridge;
use crate::session::notify::{all_resources, ChangeBatch};
use crate::session::SessionSnapshot;

use super::{assets, rolls};

/// Chat entries returned when the caller does not say how many.
const DEFAULT_CHAT_LIMIT: usize = 50;

pub fn router() -> Router<Arc<Bridge>> {
    Router::new()
        .route("/state", get(state_view))
        .route("/actors", get(actors_view))
        .route("/actors/{id}", get(actor_view))
        .route("/scene", get(scene_view))
        .route("/combat", get(combat_view))
        .route("/chat", get(chat_view))
        .route("/chat/search", get(chat_search))
        .route("/ladder/{value}", get(ladder_view))
        .route("/capture", get(capture_view))
        .route("/assets", get(assets_view))
        .route("/events", get(events))
        .route("/whisper", post(whisper))
        .route("/refresh", post(refresh))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("{what} not found"),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct StateView {
    /// Whether a peer transport is currently live.
    connected: bool,
    #[serde(flatten)]
    snapshot: SessionSnapshot,
}

async fn state_view(State(bridge): State<Arc<Bridge>>) -> Json<StateView> {
    Json(StateView {
        connected: bridge.manager.is_connected(),
        snapshot: bridge.store.snapshot(),
    })
}

async fn actors_view(State(bridge): State<Arc<Bridge>>) -> Json<HashMap<String, ActorRecord>> {
    Json(bridge.store.actors())
}

async fn actor_view(State(bridge): State<Arc<Bridge>>, Path(id): Path<String>) -> Response {
    match bridge.store.actor(&id) {
        Some(actor) => Json(actor).into_response(),
        None => not_found("actor"),
    }
}

async fn scene_view(State(bridge): State<Arc<Bridge>>) -> Json<Option<SceneRecord>> {
    Json(bridge.store.scene())
}

async fn combat_view(State(bridge): State<Arc<Bridge>>) -> Json<Option<CombatRecord>> {
    Json(bridge.store.combat())
}

/// One chat entry with roll parsing applied.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessageView {
    message: ChatRecord,
    rolls: Vec<rolls::RollSummary>,
}

fn chat_views(records: Vec<ChatRecord>) -> Vec<ChatMessageView> {
    records
        .into_iter()
        .map(|message| ChatMessageView {
            rolls: rolls::parse_rolls(&message),
            message,
        })
        .collect()
}

#[derive(Deserialize)]
struct ChatQuery {
    limit: Option<usize>,
}

async fn chat_view(
    State(bridge): State<Arc<Bridge>>,
    Query(query): Query<ChatQuery>,
) -> Json<Vec<ChatMessageView>> {
    let limit = query.limit.unwrap_or(DEFAULT_CHAT_LIMIT);
    Json(chat_views(bridge.store.recent_chat(limit)))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

async fn chat_search(
    State(bridge): State<Arc<Bridge>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<ChatMessageView>> {
    let cap = bridge.config.search_limit;
    let limit = query.limit.unwrap_or(cap).min(cap);
    Json(chat_views(bridge.store.search_chat(&query.q, limit)))
}

#[derive(Serialize)]
struct LadderView {
    value: i64,
    label: String,
}

async fn ladder_view(Path(value): Path<i64>) -> Json<LadderView> {
    Json(LadderView {
        value,
        label: rolls::describe(value),
    })
}

async fn capture_view(State(bridge): State<Arc<Bridge>>) -> Json<CaptureStatus> {
    Json(bridge.capture.status())
}

#[derive(Deserialize)]
struct AssetsQuery {
    #[serde(default)]
    path: String,
}

async fn assets_view(
    State(bridge): State<Arc<Bridge>>,
    Query(query): Query<AssetsQuery>,
) -> Response {
    let Some(root) = bridge.config.asset_root.as_deref() else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "asset listing is not configured".into(),
            }),
        )
            .into_response();
    };
    match assets::list_assets(root, &query.path).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e @ assets::AssetError::Traversal) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(assets::AssetError::NotFound) => not_found("directory"),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// SSE pulse: one `change` event per notification flush. A subscriber that
/// lags gets a catch-all batch instead of the flushes it missed.
async fn events(
    State(bridge): State<Arc<Bridge>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = bridge.store.subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        let batch = match rx.recv().await {
            Ok(batch) => batch,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "events subscriber lagged, sending catch-all");
                ChangeBatch {
                    resources: all_resources(),
                }
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        };
        let event = Event::default()
            .event("change")
            .json_data(&batch)
            .unwrap_or_else(|_| Event::default().event("change"));
        Some((Ok::<_, Infallible>(event), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct WhisperRequest {
    content: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Serialize)]
struct DeliveryView {
    /// Whether the frame was enqueued on a live connection.
    delivered: bool,
}

/// Send a whisper to the operator at the game table.
async fn whisper(
    State(bridge): State<Arc<Bridge>>,
    Json(request): Json<WhisperRequest>,
) -> Json<DeliveryView> {
    Json(DeliveryView {
        delivered: bridge.manager.send(ServerMessage::Whisper {
            content: request.content,
            title: request.title,
        }),
    })
}

/// Ask the game client to re-send a full snapshot.
async fn refresh(State(bridge): State<Arc<Bridge>>) -> Json<DeliveryView> {
    Json(DeliveryView {
        delivered: bridge.manager.send(ServerMessage::QueryState),
    })
}
