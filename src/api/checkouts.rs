//! Checkout workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::checkout::{
        ApproveCheckout, CancelCheckout, CheckoutQuery, CheckoutRecord, CreateCheckout, ReturnCheckout,
    },
    repository::paginate,
};

use super::{AuthenticatedUser, PageQuery, PaginatedCheckouts, PaginatedResponse};

/// List checkout records (clients only see their own)
#[utoipa::path(
    get,
    path = "/equipment/checkout",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(CheckoutQuery),
    responses(
        (status = 200, description = "Checkout records, newest first", body = PaginatedCheckouts)
    )
)]
pub async fn list_checkouts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<CheckoutQuery>,
) -> AppResult<Json<PaginatedResponse<CheckoutRecord>>> {
    let (page, per_page) = paginate(query.page, query.per_page);
    let (items, total) = state.services.checkouts.list(&claims, query, page, per_page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// Request equipment
#[utoipa::path(
    post,
    path = "/equipment/checkout",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    request_body = CreateCheckout,
    responses(
        (status = 201, description = "Request created in pending_approval", body = CheckoutRecord),
        (status = 400, description = "Invalid request or insufficient quantity")
    )
)]
pub async fn request_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateCheckout>,
) -> AppResult<(StatusCode, Json<CheckoutRecord>)> {
    let record = state.services.checkouts.request(&claims, data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List overdue checkouts
#[utoipa::path(
    get,
    path = "/equipment/checkout/overdue",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Checked-out records past their expected return date", body = PaginatedCheckouts)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<CheckoutRecord>>> {
    claims.require_staff()?;
    let (page, per_page) = paginate(query.page, query.per_page);
    let (items, total) = state.services.checkouts.overdue(page, per_page).await?;
    Ok(Json(PaginatedResponse::new(items, total, page, per_page)))
}

/// Get checkout details
#[utoipa::path(
    get,
    path = "/equipment/checkout/{id}",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Checkout ID")),
    responses(
        (status = 200, description = "Checkout details", body = CheckoutRecord),
        (status = 403, description = "Checkout belongs to another user"),
        (status = 404, description = "Checkout not found")
    )
)]
pub async fn get_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CheckoutRecord>> {
    Ok(Json(state.services.checkouts.get(&claims, id).await?))
}

/// Approve or reject a pending request
#[utoipa::path(
    post,
    path = "/equipment/checkout/{id}/approve",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Checkout ID")),
    request_body = ApproveCheckout,
    responses(
        (status = 200, description = "Reviewed checkout", body = CheckoutRecord),
        (status = 400, description = "Insufficient quantity"),
        (status = 409, description = "Checkout is not pending approval")
    )
)]
pub async fn approve_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ApproveCheckout>,
) -> AppResult<Json<CheckoutRecord>> {
    claims.require_approve_checkouts()?;
    Ok(Json(state.services.checkouts.approve(&claims, id, data).await?))
}

/// Cancel a pending request
#[utoipa::path(
    post,
    path = "/equipment/checkout/{id}/cancel",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Checkout ID")),
    request_body = CancelCheckout,
    responses(
        (status = 200, description = "Cancelled checkout", body = CheckoutRecord),
        (status = 409, description = "Checkout is not pending approval")
    )
)]
pub async fn cancel_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    data: Option<Json<CancelCheckout>>,
) -> AppResult<Json<CheckoutRecord>> {
    let data = data.map(|Json(d)| d).unwrap_or_default();
    Ok(Json(state.services.checkouts.cancel(&claims, id, data).await?))
}

/// Hand approved equipment over to the requester
#[utoipa::path(
    post,
    path = "/equipment/checkout/{id}/handoff",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Checkout ID")),
    responses(
        (status = 200, description = "Checkout now checked_out", body = CheckoutRecord),
        (status = 409, description = "Checkout is not approved")
    )
)]
pub async fn hand_off_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CheckoutRecord>> {
    claims.require_handle_checkouts()?;
    Ok(Json(state.services.checkouts.hand_off(&claims, id).await?))
}

/// Receive returned equipment
#[utoipa::path(
    post,
    path = "/equipment/checkout/{id}/return",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Checkout ID")),
    request_body = ReturnCheckout,
    responses(
        (status = 200, description = "Returned checkout", body = CheckoutRecord),
        (status = 400, description = "Unknown equipment in return report"),
        (status = 409, description = "Checkout is not checked out")
    )
)]
pub async fn return_checkout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    data: Option<Json<ReturnCheckout>>,
) -> AppResult<Json<CheckoutRecord>> {
    claims.require_handle_checkouts()?;
    let data = data.map(|Json(d)| d).unwrap_or_default();
    Ok(Json(state.services.checkouts.return_equipment(&claims, id, data).await?))
}
