//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    activities, auth, checkouts, equipment, health, maintenance, notifications, reports, users,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Studio Equipment API",
        version = "0.3.0",
        description = "Equipment inventory, checkout workflow, maintenance log and notifications for studio operations",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Studio Ops Team", email = "dev@studio-ops.example")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        // Equipment
        equipment::list_equipment,
        equipment::list_categories,
        equipment::maintenance_due,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        equipment::equipment_checkouts,
        // Checkouts
        checkouts::list_checkouts,
        checkouts::request_checkout,
        checkouts::list_overdue,
        checkouts::get_checkout,
        checkouts::approve_checkout,
        checkouts::cancel_checkout,
        checkouts::hand_off_checkout,
        checkouts::return_checkout,
        // Maintenance
        maintenance::list_maintenance,
        maintenance::create_maintenance,
        // Notifications
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
        notifications::stream,
        // Activities
        activities::list_activities,
        // Reports
        reports::equipment_report,
        reports::dashboard,
    ),
    components(
        schemas(
            // Enums
            crate::models::enums::Role,
            crate::models::enums::EquipmentStatus,
            crate::models::enums::MaintenanceStatus,
            crate::models::enums::MaintenanceType,
            crate::models::enums::MaintenanceRecordStatus,
            crate::models::enums::CheckoutStatus,
            crate::models::enums::ReturnCondition,
            crate::models::enums::NotificationPriority,
            crate::models::enums::RelatedEntity,
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::api::PaginatedUsers,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::PricingPeriod,
            crate::models::equipment::PricingTier,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::api::PaginatedEquipment,
            // Checkouts
            crate::models::checkout::CheckoutRecord,
            crate::models::checkout::CheckoutLine,
            crate::models::checkout::CheckoutLineRequest,
            crate::models::checkout::CreateCheckout,
            crate::models::checkout::ApproveCheckout,
            crate::models::checkout::CancelCheckout,
            crate::models::checkout::ReturnLine,
            crate::models::checkout::ReturnCheckout,
            crate::api::PaginatedCheckouts,
            // Maintenance
            crate::models::maintenance::MaintenanceRecord,
            crate::models::maintenance::CreateMaintenanceRecord,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::MarkRead,
            notifications::UnreadCountResponse,
            notifications::MarkAllReadResponse,
            crate::api::PaginatedNotifications,
            // Activities
            crate::models::activity::Activity,
            crate::api::PaginatedActivities,
            // Reports
            reports::StatEntry,
            reports::UnitTotals,
            reports::CategoryEntry,
            reports::EquipmentReport,
            reports::DashboardResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "equipment", description = "Equipment catalog"),
        (name = "checkouts", description = "Checkout and return workflow"),
        (name = "maintenance", description = "Maintenance log"),
        (name = "notifications", description = "In-app notifications and live stream"),
        (name = "activities", description = "Activity history"),
        (name = "reports", description = "Statistics and dashboard")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_workflow_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/equipment/checkout",
            "/equipment/checkout/{id}/approve",
            "/equipment/checkout/{id}/return",
            "/equipment/{id}/maintenance",
            "/notifications/stream",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
