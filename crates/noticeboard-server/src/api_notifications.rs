//! HTTP handlers for notification resources.

use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use noticeboard_notifications::{
    fetch_notification, list_notifications, CreateNotification, EditNotification,
    NotificationError, NotificationFilter, NotificationRecord,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Error type for notification handlers.
///
/// Serialized as `{"error": <message>, "kind": <machine kind>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A validation or lookup failure from the notifications layer.
    #[error(transparent)]
    Notification(#[from] NotificationError),
    /// The request body, path, or query string could not be decoded.
    #[error("invalid request: {0}")]
    BadRequest(String),
    /// A failure outside the notifications layer, such as a join error.
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Notification(e) => e.kind(),
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::InternalServerError(_) => "Internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match &self {
            ApiError::Notification(NotificationError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Notification(NotificationError::Store(e)) => {
                tracing::error!(error = %e, "notification store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Notification(e) => {
                tracing::debug!(kind, error = %e, "notification request rejected");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Body of `POST /users/{user_id}/notifications`.
#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub content: String,
}

/// Runs a blocking notifications call off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, NotificationError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
        .map_err(ApiError::from)
}

async fn list_matching(
    state: Arc<AppState>,
    filter: NotificationFilter,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    let notifications =
        blocking(move || list_notifications(state.store.as_ref(), &filter)).await?;
    Ok(Json(notifications.iter().map(NotificationRecord::from).collect()))
}

/// Handler for `GET /notifications`.
///
/// Accepts optional `user_id` and `read` query parameters.
pub async fn list_notifications_handler(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<NotificationFilter>, QueryRejection>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    let Query(filter) = query?;
    list_matching(state, filter).await
}

/// Handler for `POST /notifications`.
pub async fn create_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<CreateNotification>, JsonRejection>,
) -> Result<(StatusCode, Json<NotificationRecord>), ApiError> {
    let Json(input) = payload?;
    let created = blocking(move || state.validator.create(&input)).await?;
    Ok((StatusCode::CREATED, Json(created.to_record())))
}

/// Handler for `GET /notifications/{id}`.
pub async fn get_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<NotificationRecord>, ApiError> {
    let Path(id) = id?;
    let notification = blocking(move || fetch_notification(state.store.as_ref(), id)).await?;
    Ok(Json(notification.to_record()))
}

/// Handler for `PATCH /notifications/{id}`.
pub async fn edit_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EditNotification>, JsonRejection>,
) -> Result<Json<NotificationRecord>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let edited = blocking(move || state.validator.edit(id, &input)).await?;
    Ok(Json(edited.to_record()))
}

/// Handler for `GET /users/{user_id}/notifications`.
pub async fn list_user_notifications_handler(
    Extension(state): Extension<Arc<AppState>>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    let Path(user_id) = user_id?;
    list_matching(state, NotificationFilter::for_user(user_id)).await
}

/// Handler for `GET /users/{user_id}/notifications/read`.
pub async fn list_user_read_handler(
    Extension(state): Extension<Arc<AppState>>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    let Path(user_id) = user_id?;
    list_matching(state, NotificationFilter::for_user(user_id).with_read(true)).await
}

/// Handler for `GET /users/{user_id}/notifications/unread`.
pub async fn list_user_unread_handler(
    Extension(state): Extension<Arc<AppState>>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    let Path(user_id) = user_id?;
    list_matching(state, NotificationFilter::for_user(user_id).with_read(false)).await
}

/// Handler for `POST /users/{user_id}/notifications`.
///
/// Sends `content` to the user now; the notification starts unread.
pub async fn send_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    user_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NotificationRecord>), ApiError> {
    let Path(user_id) = user_id?;
    let Json(request) = payload?;
    let sent = blocking(move || state.validator.send(user_id, &request.content)).await?;
    Ok((StatusCode::CREATED, Json(sent.to_record())))
}
