//! Activity history model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};

/// Entry of the append-only activity history
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Activity {
    pub id: i32,
    pub actor_id: Option<i32>,
    pub actor_name: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i32,
    pub description: String,
    #[schema(value_type = Object)]
    pub details: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Activity to append
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor_id: Option<i32>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: i32,
    pub description: String,
    pub details: serde_json::Value,
}

impl NewActivity {
    pub fn new(
        actor_id: i32,
        action: &'static str,
        entity_type: &'static str,
        entity_id: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: Some(actor_id),
            action,
            entity_type,
            entity_id,
            description: description.into(),
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Activity actions
pub mod actions {
    pub const EQUIPMENT_CREATED: &str = "equipment_created";
    pub const EQUIPMENT_UPDATED: &str = "equipment_updated";
    pub const EQUIPMENT_DELETED: &str = "equipment_deleted";
    pub const CHECKOUT_REQUESTED: &str = "checkout_requested";
    pub const CHECKOUT_APPROVED: &str = "checkout_approved";
    pub const CHECKOUT_REJECTED: &str = "checkout_rejected";
    pub const CHECKOUT_CANCELLED: &str = "checkout_cancelled";
    pub const CHECKOUT_HANDED_OFF: &str = "checkout_handed_off";
    pub const CHECKOUT_RETURNED: &str = "checkout_returned";
    pub const MAINTENANCE_LOGGED: &str = "maintenance_logged";
}

/// Entity types referenced by activities
pub mod entities {
    pub const EQUIPMENT: &str = "equipment";
    pub const CHECKOUT: &str = "checkout";
}

/// Activity feed query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ActivityQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i32>,
    pub actor_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
