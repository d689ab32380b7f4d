use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{identity, security};
use crate::AppState;

pub mod handlers;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the versioned API router.
/// All routes are relative; the caller mounts this under `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/count", get(handlers::count_unread_notifications))
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route(
            "/notifications/:id",
            get(handlers::get_notification).patch(handlers::mark_notification_read),
        )
        .route("/notify/email", post(handlers::send_email))
        .route("/notify/sms", post(handlers::send_sms))
        .layer(middleware::from_fn_with_state(
            state,
            identity::resolve_identity,
        ))
        .fallback(fallback_404)
}

/// Full application: probes, the `/api/v1` surface, and the shared layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints (no auth)
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readiness_check))
        .nest("/api/v1", api_router(state.clone()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security::request_id))
        .layer(middleware::from_fn(security::security_headers))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// 200 when storage answers a trivial query, 503 otherwise.
async fn readiness_check(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.service.ping().await.map_err(|e| {
        tracing::warn!("readiness check failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}
