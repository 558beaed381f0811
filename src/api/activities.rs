//! Activity history endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::activity::{Activity, ActivityQuery},
    repository::paginate,
};

use super::{AuthenticatedUser, PaginatedActivities, PaginatedResponse};

/// Activity history, newest first
#[utoipa::path(
    get,
    path = "/activities",
    tag = "activities",
    security(("bearer_auth" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity entries", body = PaginatedActivities),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn list_activities(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<PaginatedResponse<Activity>>> {
    claims.require_staff()?;
    let (page, per_page) = paginate(query.page, query.per_page);
    let (items, total) = state.services.activities.search(&query, page, per_page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}
