//! Notification feed and live stream endpoints

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{
        notification::{LivePayload, MarkRead, Notification, NotificationQuery},
        user::UserClaims,
    },
    repository::paginate,
};

use super::{AuthenticatedUser, PaginatedNotifications, PaginatedResponse};

#[derive(Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Number of notifications that changed
    pub updated: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StreamQuery {
    /// Bearer token, for clients that cannot set headers (EventSource)
    pub token: Option<String>,
}

/// List the current user's notifications
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = PaginatedNotifications)
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let (page, per_page) = paginate(query.page, query.per_page);
    let (items, total) = state
        .services
        .notifications
        .list(claims.user_id, query.unread_only.unwrap_or(false), page, per_page)
        .await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// Number of unread notifications
#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse)
    )
)]
pub async fn unread_count(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UnreadCountResponse>> {
    let count = state.services.notifications.unread_count(claims.user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Mark one notification read or unread
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    request_body = MarkRead,
    responses(
        (status = 200, description = "Updated notification", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Option<Json<MarkRead>>,
) -> AppResult<Json<Notification>> {
    let read = body.map(|Json(b)| b.read).unwrap_or(true);
    let notification = state
        .services
        .notifications
        .mark_read(id, claims.user_id, read)
        .await?;
    Ok(Json(notification))
}

/// Mark every notification read
#[utoipa::path(
    put,
    path = "/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications marked read", body = MarkAllReadResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state.services.notifications.mark_all_read(claims.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Delete a notification
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete_notification(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.notifications.delete(id, claims.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn to_event(payload: &LivePayload) -> Result<Event, axum::Error> {
    let event = Event::default().event(payload.name());
    match payload {
        LivePayload::NewNotification(notification) => event.json_data(notification),
        LivePayload::UnreadCount { count } => event.json_data(UnreadCountResponse { count: *count }),
    }
}

/// Live notification events for the current user (Server-Sent Events)
#[utoipa::path(
    get,
    path = "/notifications/stream",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(StreamQuery),
    responses(
        (status = 200, description = "`new_notification` and `unread_count` events", content_type = "text/event-stream"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn stream(
    State(state): State<crate::AppState>,
    auth: Option<AuthenticatedUser>,
    Query(query): Query<StreamQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let claims = match (auth, query.token) {
        (Some(AuthenticatedUser(claims)), _) => claims,
        (None, Some(token)) => UserClaims::from_token(&token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?,
        (None, None) => {
            return Err(AppError::Authentication("Missing or invalid bearer token".to_string()))
        }
    };

    let user_id = claims.user_id;
    let unread = state.services.notifications.unread_count(user_id).await?;
    tracing::debug!(user_id, "Live notification stream opened");

    let initial = tokio_stream::once(to_event(&LivePayload::UnreadCount { count: unread }));
    let live = BroadcastStream::new(state.services.notifications.subscribe()).filter_map(move |item| match item {
        Ok(event) if event.user_id == user_id => Some(to_event(&event.payload)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(user_id, error = %e, "Live subscriber lagged");
            None
        }
    });

    Ok(Sse::new(initial.chain(live)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
