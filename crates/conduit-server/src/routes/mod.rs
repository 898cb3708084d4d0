//! HTTP surface: login, project listing, session listing, and the
//! WebSocket upgrade.


use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use conduit_session::{SessionHost, SessionInfo};
use serde::{Deserialize, Serialize};

use crate::connection;
use crate::gate::{GateError, Project, RemoteGate};

/// Everything a handler needs. Constructed once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub host: SessionHost,
    pub gate: Arc<RemoteGate>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/projects", get(projects))
        .route("/api/sessions", get(sessions))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

// =============================================================================
// Auth extractor
// =============================================================================

/// Proof that the request carried a token issued by this process.
///
/// The token is read from `Authorization: Bearer <token>`, falling back to
/// a `?token=` query parameter.
pub struct Authorized;

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = GateError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts);
        state.gate.authorize(token.as_deref()).await?;
        Ok(Authorized)
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if header.is_some() {
        return header;
    }
    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.token)
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, GateError> {
    let token = state.gate.authenticate(&request.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectsResponse {
    projects: Vec<Project>,
    binary_found: bool,
}

async fn projects(_auth: Authorized, State(state): State<AppState>) -> Json<ProjectsResponse> {
    let projects = state.gate.list_projects();
    let binary_found = state.host.locate().await.is_ok();
    Json(ProjectsResponse {
        projects,
        binary_found,
    })
}

async fn sessions(_auth: Authorized, State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    Json(state.host.sessions().await)
}

/// Query parameters of a relay connection.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
    pub dir: Option<String>,
}

/// Upgrade unconditionally; credentials are checked on the socket so a
/// refusal can carry a close code the client understands.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let peer = peer.map(|ConnectInfo(addr)| addr);
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state, params, peer))
}
