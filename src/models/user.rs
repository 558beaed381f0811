//! User model, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::Role;
use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    #[schema(write_only)]
    pub password: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.firstname, &self.lastname) {
            (Some(f), Some(l)) => format!("{} {}", f, l),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => self.login.clone(),
        }
    }
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Search by login or name
    pub name: Option<String>,
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    /// Login (username) - unique, used for authentication
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Defaults to `client`
    pub role: Option<Role>,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl Role {
    pub fn can_manage_equipment(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::DepartmentAdmin)
    }

    pub fn can_approve_checkouts(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::DepartmentAdmin)
    }

    /// Hand-off and return desk duties
    pub fn can_handle_checkouts(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::DepartmentAdmin | Role::Reception)
    }

    pub fn can_log_maintenance(&self) -> bool {
        matches!(
            self,
            Role::SuperAdmin | Role::DepartmentAdmin | Role::DepartmentStaff
        )
    }

    /// Staff see every checkout, activities and reports; clients only their own
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    fn require(&self, allowed: bool, what: &str) -> Result<(), AppError> {
        if allowed {
            Ok(())
        } else {
            Err(AppError::Authorization(format!("Insufficient rights to {}", what)))
        }
    }

    // Authorization checks
    pub fn require_manage_equipment(&self) -> Result<(), AppError> {
        self.require(self.role.can_manage_equipment(), "manage equipment")
    }

    pub fn require_approve_checkouts(&self) -> Result<(), AppError> {
        self.require(self.role.can_approve_checkouts(), "approve checkouts")
    }

    pub fn require_handle_checkouts(&self) -> Result<(), AppError> {
        self.require(self.role.can_handle_checkouts(), "hand off or receive equipment")
    }

    pub fn require_log_maintenance(&self) -> Result<(), AppError> {
        self.require(self.role.can_log_maintenance(), "log maintenance")
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require(self.role.is_staff(), "view studio-wide data")
    }

    pub fn require_manage_users(&self) -> Result<(), AppError> {
        self.require(self.role.can_manage_users(), "manage users")
    }
}
