//! Maintenance log endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::maintenance::{CreateMaintenanceRecord, MaintenanceRecord},
};

use super::AuthenticatedUser;

/// Maintenance history of an item, newest first
#[utoipa::path(
    get,
    path = "/equipment/{id}/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Maintenance records", body = Vec<MaintenanceRecord>),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn list_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<MaintenanceRecord>>> {
    claims.require_staff()?;
    Ok(Json(state.services.maintenance.list(id).await?))
}

/// Append a maintenance record
#[utoipa::path(
    post,
    path = "/equipment/{id}/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = CreateMaintenanceRecord,
    responses(
        (status = 201, description = "Record appended", body = MaintenanceRecord),
        (status = 400, description = "Invalid record"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn create_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CreateMaintenanceRecord>,
) -> AppResult<(StatusCode, Json<MaintenanceRecord>)> {
    claims.require_log_maintenance()?;
    let record = state.services.maintenance.append(&claims, id, data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
