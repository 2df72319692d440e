//! REST endpoints that let a web front end drive a chat session.
//!
//! Every route names the visitor; the front end keeps its id in browser
//! storage, so each browser gets its own conversations.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use super::manager::{ChatSession, SessionHub, TurnOutcome};
use super::model::FlowKind;
use super::state::fields;
use crate::error::{Error, FlowError};

/// Shared state for chat routes.
#[derive(Clone)]
pub struct ChatRouteState {
    pub hub: Arc<SessionHub>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenParams {
    /// Seeds `firstName` when the session is first opened.
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceBody {
    label: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    text: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Visitor ids are opaque tokens chosen by the front end.
fn valid_visitor(visitor: &str) -> bool {
    (1..=64).contains(&visitor.len())
        && visitor
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn parse_target(visitor: &str, slug: &str) -> Result<FlowKind, Response> {
    if !valid_visitor(visitor) {
        return Err(error(StatusCode::BAD_REQUEST, "invalid visitor id"));
    }
    slug.parse()
        .map_err(|e: FlowError| error(StatusCode::NOT_FOUND, e.to_string()))
}

async fn open(
    state: &ChatRouteState,
    visitor: &str,
    slug: &str,
    params: OpenParams,
) -> Result<Arc<ChatSession>, Response> {
    let flow = parse_target(visitor, slug)?;

    let mut seed = BTreeMap::new();
    if let Some(name) = params.first_name.filter(|n| !n.trim().is_empty()) {
        seed.insert(fields::FIRST_NAME.to_string(), name.trim().to_string());
    }

    state
        .hub
        .session(visitor, flow, seed)
        .await
        .map_err(|e| match e {
            Error::Flow(e @ FlowError::MissingFirstName { .. }) => {
                error(StatusCode::BAD_REQUEST, e.to_string())
            }
            e => {
                tracing::error!(visitor, flow = %slug, error = %e, "Failed to open chat session");
                error(StatusCode::INTERNAL_SERVER_ERROR, "failed to open session")
            }
        })
}

fn turn_response(outcome: TurnOutcome) -> Response {
    let status = if outcome.rejection.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    (status, Json(outcome)).into_response()
}

/// GET /api/chat/{visitor}/{flow}
///
/// Returns the session snapshot, opening the session if needed. Flows that
/// greet by name need `?first_name=` on first open.
async fn get_session(
    State(state): State<ChatRouteState>,
    Path((visitor, flow)): Path<(String, String)>,
    Query(params): Query<OpenParams>,
) -> Response {
    match open(&state, &visitor, &flow, params).await {
        Ok(session) => Json(session.snapshot().await).into_response(),
        Err(response) => response,
    }
}

/// POST /api/chat/{visitor}/{flow}/choice
async fn post_choice(
    State(state): State<ChatRouteState>,
    Path((visitor, flow)): Path<(String, String)>,
    Json(body): Json<ChoiceBody>,
) -> Response {
    match open(&state, &visitor, &flow, OpenParams::default()).await {
        Ok(session) => turn_response(session.choose(&body.label).await),
        Err(response) => response,
    }
}

/// POST /api/chat/{visitor}/{flow}/message
///
/// Waits for the AI reply so the response carries it.
async fn post_message(
    State(state): State<ChatRouteState>,
    Path((visitor, flow)): Path<(String, String)>,
    Json(body): Json<MessageBody>,
) -> Response {
    match open(&state, &visitor, &flow, OpenParams::default()).await {
        Ok(session) => turn_response(session.send_and_wait(&body.text).await),
        Err(response) => response,
    }
}

/// DELETE /api/chat/{visitor}/{flow}
async fn delete_session(
    State(state): State<ChatRouteState>,
    Path((visitor, flow)): Path<(String, String)>,
) -> Response {
    let flow = match parse_target(&visitor, &flow) {
        Ok(flow) => flow,
        Err(response) => return response,
    };
    match state.hub.discard(&visitor, flow).await {
        Ok(cleared) => Json(serde_json::json!({ "cleared": cleared })).into_response(),
        Err(e) => {
            tracing::error!(visitor = %visitor, flow = %flow, error = %e, "Failed to clear chat session");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to clear session")
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the chat REST routes.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route(
            "/api/chat/{visitor}/{flow}",
            get(get_session).delete(delete_session),
        )
        .route("/api/chat/{visitor}/{flow}/choice", post(post_choice))
        .route("/api/chat/{visitor}/{flow}/message", post(post_message))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
