//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppResult;

use super::AuthenticatedUser;

/// One labelled count
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

/// Unit totals across the catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnitTotals {
    /// Number of equipment items
    pub items: i64,
    /// Sum of owned units
    pub owned: i64,
    /// Units currently out or reserved
    pub out: i64,
    /// Units that can still be allocated
    pub available: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryEntry {
    pub category: String,
    pub items: i64,
    pub units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EquipmentReport {
    pub units: UnitTotals,
    /// Items per derived checkout status
    pub by_checkout_status: Vec<StatEntry>,
    /// Items per derived maintenance status
    pub by_maintenance_status: Vec<StatEntry>,
    /// Checkout records per status, `overdue` split out of `checked_out`
    pub checkouts_by_status: Vec<StatEntry>,
    pub overdue_checkouts: i64,
    pub maintenance_year: i32,
    /// Total maintenance cost for `maintenance_year`
    #[schema(value_type = String, example = "1250.00")]
    pub maintenance_cost: Decimal,
    pub top_categories: Vec<CategoryEntry>,
}

/// Dashboard cards; staff-only cards are omitted for other roles
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub unread_notifications: i64,
    /// The user's own pending, approved and checked-out records
    pub active_checkouts: i64,
    pub overdue_checkouts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approvals: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_attention: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Year used for maintenance cost (defaults to the current year)
    pub year: Option<i32>,
}

/// Equipment, checkout and maintenance statistics
#[utoipa::path(
    get,
    path = "/reports/equipment",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportQuery),
    responses(
        (status = 200, description = "Equipment report", body = EquipmentReport),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn equipment_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<EquipmentReport>> {
    claims.require_staff()?;
    Ok(Json(state.services.reports.equipment_report(query.year).await?))
}

/// Dashboard for the current user
#[utoipa::path(
    get,
    path = "/reports/dashboard",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard cards", body = DashboardResponse)
    )
)]
pub async fn dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    Ok(Json(state.services.reports.dashboard(&claims).await?))
}
