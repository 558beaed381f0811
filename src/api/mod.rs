//! API handlers for the studio equipment REST endpoints

pub mod activities;
pub mod auth;
pub mod checkouts;
pub mod equipment;
pub mod health;
pub mod maintenance;
pub mod notifications;
pub mod openapi;
pub mod reports;
pub mod users;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or invalid bearer token".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Page parameters for listings without other filters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    /// Items per page (default 20, max 100)
    pub per_page: Option<i64>,
}

/// Paginated response
#[derive(Serialize, ToSchema)]
#[aliases(
    PaginatedEquipment = PaginatedResponse<crate::models::equipment::Equipment>,
    PaginatedCheckouts = PaginatedResponse<crate::models::checkout::CheckoutRecord>,
    PaginatedNotifications = PaginatedResponse<crate::models::notification::Notification>,
    PaginatedActivities = PaginatedResponse<crate::models::activity::Activity>,
    PaginatedUsers = PaginatedResponse<crate::models::user::User>
)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Self {
        Self {
            items,
            total,
            page,
            per_page,
        }
    }
}
