//! HTTP surface for the console's notification panel.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::center::{NotificationCenter, PanelSnapshot};
use crate::notification::NotificationId;

pub type AppState = Arc<NotificationCenter>;

pub fn router(center: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/notifications", get(panel).delete(clear_all))
        .route("/notifications/refresh", post(refresh))
        .route("/notifications/{id}", delete(remove))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/session", post(login).delete(logout))
        .route("/connectivity", post(connectivity))
        .layer(CorsLayer::very_permissive())
        .with_state(center)
}

async fn panel(State(center): State<AppState>) -> Json<PanelSnapshot> {
    Json(center.panel())
}

async fn refresh(State(center): State<AppState>) -> (StatusCode, Json<Value>) {
    center.refresh();
    (StatusCode::ACCEPTED, Json(json!({ "scheduled": true })))
}

async fn mark_read(State(center): State<AppState>, Path(id): Path<String>) -> StatusCode {
    found_or_404(center.mark_read(&NotificationId::parse_lenient(&id)))
}

async fn remove(State(center): State<AppState>, Path(id): Path<String>) -> StatusCode {
    found_or_404(center.remove(&NotificationId::parse_lenient(&id)))
}

async fn clear_all(State(center): State<AppState>) -> StatusCode {
    center.clear_all();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct LoginReq {
    token: String,
}

async fn login(State(center): State<AppState>, Json(body): Json<LoginReq>) -> StatusCode {
    if body.token.trim().is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    center.session().login(body.token.trim());
    StatusCode::NO_CONTENT
}

async fn logout(State(center): State<AppState>) -> StatusCode {
    center.session().logout();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct ConnectivityReq {
    online: bool,
}

async fn connectivity(
    State(center): State<AppState>,
    Json(body): Json<ConnectivityReq>,
) -> StatusCode {
    center.network().set_online(body.online);
    StatusCode::NO_CONTENT
}

fn found_or_404(found: bool) -> StatusCode {
    if found {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
