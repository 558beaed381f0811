//! Shared domain enums, stored as lowercase snake_case TEXT columns

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Implements string conversions and the SQLx TEXT mapping for a fieldless enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($label => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

/// Checkout status label of an equipment item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    CheckedOut,
    Maintenance,
    Damaged,
    Retired,
}

text_enum!(EquipmentStatus {
    Available => "available",
    CheckedOut => "checked_out",
    Maintenance => "maintenance",
    Damaged => "damaged",
    Retired => "retired",
});

impl EquipmentStatus {
    /// Statuses that are owned by staff decisions rather than by unit counts
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            EquipmentStatus::Maintenance | EquipmentStatus::Damaged | EquipmentStatus::Retired
        )
    }
}

// ---------------------------------------------------------------------------
// MaintenanceStatus
// ---------------------------------------------------------------------------

/// Derived upkeep label of an equipment item (never stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    UpToDate,
    DueSoon,
    Overdue,
    InMaintenance,
}

text_enum!(MaintenanceStatus {
    UpToDate => "up_to_date",
    DueSoon => "due_soon",
    Overdue => "overdue",
    InMaintenance => "in_maintenance",
});

// ---------------------------------------------------------------------------
// MaintenanceType / MaintenanceRecordStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    Preventive,
    Repair,
    Inspection,
    Cleaning,
    Calibration,
    Other,
}

text_enum!(MaintenanceType {
    Preventive => "preventive",
    Repair => "repair",
    Inspection => "inspection",
    Cleaning => "cleaning",
    Calibration => "calibration",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceRecordStatus {
    Scheduled,
    InProgress,
    Completed,
}

text_enum!(MaintenanceRecordStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
});

// ---------------------------------------------------------------------------
// CheckoutStatus
// ---------------------------------------------------------------------------

/// Checkout record status. `Overdue` is only ever produced by
/// [`crate::models::checkout::effective_status`]; it is not written to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    PendingApproval,
    Approved,
    CheckedOut,
    Overdue,
    Returned,
    Cancelled,
}

text_enum!(CheckoutStatus {
    PendingApproval => "pending_approval",
    Approved => "approved",
    CheckedOut => "checked_out",
    Overdue => "overdue",
    Returned => "returned",
    Cancelled => "cancelled",
});

// ---------------------------------------------------------------------------
// ReturnCondition
// ---------------------------------------------------------------------------

/// Condition reported for a line item when it comes back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    Damaged,
}

text_enum!(ReturnCondition {
    Excellent => "excellent",
    Good => "good",
    Fair => "fair",
    Poor => "poor",
    Damaged => "damaged",
});

// ---------------------------------------------------------------------------
// Notification enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

text_enum!(NotificationPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Entity a notification points back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntity {
    Task,
    Booking,
    Invoice,
    Equipment,
    Checkout,
}

text_enum!(RelatedEntity {
    Task => "task",
    Booking => "booking",
    Invoice => "invoice",
    Equipment => "equipment",
    Checkout => "checkout",
});

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Studio user role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    DepartmentAdmin,
    Reception,
    DepartmentStaff,
    Client,
}

text_enum!(Role {
    SuperAdmin => "super_admin",
    DepartmentAdmin => "department_admin",
    Reception => "reception",
    DepartmentStaff => "department_staff",
    Client => "client",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!("checked_out".parse::<EquipmentStatus>(), Ok(EquipmentStatus::CheckedOut));
        assert_eq!("PENDING_APPROVAL".parse::<CheckoutStatus>(), Ok(CheckoutStatus::PendingApproval));
        assert_eq!("department_staff".parse::<Role>(), Ok(Role::DepartmentStaff));
        assert!("lost".parse::<ReturnCondition>().is_err());
    }

    #[test]
    fn test_serde_matches_db_labels() {
        for status in CheckoutStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        for status in MaintenanceStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(!EquipmentStatus::Available.is_blocking());
        assert!(!EquipmentStatus::CheckedOut.is_blocking());
        assert!(EquipmentStatus::Maintenance.is_blocking());
        assert!(EquipmentStatus::Damaged.is_blocking());
        assert!(EquipmentStatus::Retired.is_blocking());
    }
}
