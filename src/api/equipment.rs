//! Equipment catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        checkout::CheckoutRecord,
        equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
    },
    repository::paginate,
};

use super::{AuthenticatedUser, PageQuery, PaginatedCheckouts, PaginatedEquipment, PaginatedResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct MaintenanceDueQuery {
    /// Lookahead in days (defaults to the configured value)
    pub days: Option<i64>,
}

/// List equipment with filters and pagination
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentQuery),
    responses(
        (status = 200, description = "Equipment list", body = PaginatedEquipment)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<PaginatedResponse<Equipment>>> {
    let (page, per_page) = paginate(query.page, query.per_page);
    let (items, total) = state.services.equipment.search(&query, page, per_page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// List equipment categories
#[utoipa::path(
    get,
    path = "/equipment/categories",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Distinct categories", body = Vec<String>)
    )
)]
pub async fn list_categories(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.services.equipment.categories().await?))
}

/// Items that are due, overdue or in maintenance
#[utoipa::path(
    get,
    path = "/equipment/maintenance/due",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(MaintenanceDueQuery),
    responses(
        (status = 200, description = "Items needing maintenance attention", body = Vec<Equipment>)
    )
)]
pub async fn maintenance_due(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MaintenanceDueQuery>,
) -> AppResult<Json<Vec<Equipment>>> {
    claims.require_staff()?;
    Ok(Json(state.services.equipment.maintenance_due(query.days).await?))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Equipment>> {
    Ok(Json(state.services.equipment.get_by_id(id).await?))
}

/// Create equipment
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    claims.require_manage_equipment()?;
    let equipment = state.services.equipment.create(claims.user_id, &data).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Update equipment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 400, description = "Invalid quantity or status"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    claims.require_manage_equipment()?;
    let equipment = state.services.equipment.update(claims.user_id, id, &data).await?;
    Ok(Json(equipment))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Equipment is in use")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_manage_equipment()?;
    state.services.equipment.delete(claims.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Checkout history of an equipment item
#[utoipa::path(
    get,
    path = "/equipment/{id}/checkouts",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID"), PageQuery),
    responses(
        (status = 200, description = "Checkout records including the item", body = PaginatedCheckouts),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn equipment_checkouts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<CheckoutRecord>>> {
    claims.require_staff()?;
    let (page, per_page) = paginate(query.page, query.per_page);
    let (items, total) = state.services.checkouts.for_equipment(id, page, per_page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}
