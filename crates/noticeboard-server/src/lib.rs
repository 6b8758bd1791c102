//! Noticeboard server library logic.

pub mod api_notifications;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Extension, Json, Router,
};
use noticeboard_notifications::{Clock, NotificationStore, SystemClock, Validator};
use noticeboard_types::{EditPolicy, NOTIFICATIONS_PATH};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Record store for reads.
    pub store: Arc<dyn NotificationStore>,
    /// Validated write path over the same store.
    pub validator: Arc<Validator>,
}

impl AppState {
    /// Builds state that validates against wall-clock time.
    pub fn new(store: Arc<dyn NotificationStore>, policy: EditPolicy) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), policy)
    }

    pub fn with_clock(
        store: Arc<dyn NotificationStore>,
        clock: Arc<dyn Clock>,
        policy: EditPolicy,
    ) -> Self {
        let validator = Arc::new(Validator::new(store.clone(), clock, policy));
        Self { store, validator }
    }
}

/// Maximum request body size (64 KiB). Notification bodies are tiny.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    tracing::debug!(policy = %state.validator.policy(), "building router");
    let notification_path = format!("{NOTIFICATIONS_PATH}/{{id}}");

    Router::new()
        .route("/health", get(health))
        .route(
            NOTIFICATIONS_PATH,
            get(api_notifications::list_notifications_handler)
                .post(api_notifications::create_notification_handler),
        )
        .route(
            &notification_path,
            get(api_notifications::get_notification_handler)
                .patch(api_notifications::edit_notification_handler),
        )
        .route(
            "/users/{user_id}/notifications",
            get(api_notifications::list_user_notifications_handler)
                .post(api_notifications::send_notification_handler),
        )
        .route(
            "/users/{user_id}/notifications/read",
            get(api_notifications::list_user_read_handler),
        )
        .route(
            "/users/{user_id}/notifications/unread",
            get(api_notifications::list_user_unread_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
