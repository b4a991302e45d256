use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use chess_relay_core::{RequestPolicy, Transport, TransportKind};

use crate::AppState;

pub mod analyze;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub transport: String,
    pub depth: u32,
    pub policy: String,
}

pub fn router<T: Transport + 'static>(state: Arc<AppState<T>>) -> Router {
    Router::new()
        .route("/", get(index::<T>))
        .route("/api/v1/health", get(health::<T>))
        .route("/api/v1/analyze", post(analyze::analyze::<T>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn index<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Response {
    let template = IndexTemplate {
        title: "Chess Relay".to_string(),
        transport: match state.transport {
            TransportKind::Ssh => "ssh".to_string(),
            TransportKind::Local => "local".to_string(),
        },
        depth: state.analyzer.settings().depth,
        policy: match state.policy {
            RequestPolicy::Strict => "strict".to_string(),
            RequestPolicy::Lenient => "lenient".to_string(),
        },
    };
    match template.render() {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::error!("Template error: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn health<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Response {
    match state.analyzer.health().await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
