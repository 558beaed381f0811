//! Data models for the studio equipment server

pub mod activity;
pub mod checkout;
pub mod enums;
pub mod equipment;
pub mod maintenance;
pub mod notification;
pub mod user;

// Re-export commonly used types
pub use activity::{Activity, NewActivity};
pub use checkout::{CheckoutLine, CheckoutRecord};
pub use enums::{
    CheckoutStatus, EquipmentStatus, MaintenanceRecordStatus, MaintenanceStatus, MaintenanceType,
    NotificationPriority, RelatedEntity, ReturnCondition, Role,
};
pub use equipment::{Equipment, PricingTier, Stock};
pub use maintenance::MaintenanceRecord;
pub use notification::{LiveEvent, LivePayload, NewNotification, Notification};
pub use user::{User, UserClaims};
