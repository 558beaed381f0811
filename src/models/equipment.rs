//! Equipment model and quantity accounting

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{EquipmentStatus, MaintenanceRecordStatus, MaintenanceStatus, ReturnCondition};
use super::maintenance::derive_maintenance_status;
use crate::error::{AppError, AppResult};

/// Billing period of a pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PricingPeriod {
    Hour,
    Day,
    Week,
    Month,
}

/// Rental price for a given period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricingTier {
    pub label: String,
    pub period: PricingPeriod,
    #[schema(value_type = String, example = "45.00")]
    pub price: Decimal,
}

/// Equipment row as stored, joined with the status of its latest non-scheduled
/// maintenance record
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub tags: Vec<String>,
    pub pricing_tiers: Json<Vec<PricingTier>>,
    pub available_quantity: i32,
    pub current_quantity_out: i32,
    pub checkout_status: EquipmentStatus,
    pub next_maintenance_date: Option<NaiveDate>,
    pub work_status: Option<MaintenanceRecordStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentRow {
    /// Attach the derived fields. This is the only place they are computed.
    pub fn into_equipment(self, today: NaiveDate, lookahead_days: i64) -> Equipment {
        let stock = Stock {
            total: self.available_quantity,
            out: self.current_quantity_out,
            status: self.checkout_status,
        };
        let maintenance_status = derive_maintenance_status(
            self.work_status,
            self.next_maintenance_date,
            today,
            lookahead_days,
        );

        Equipment {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            serial_number: self.serial_number,
            tags: self.tags,
            pricing_tiers: self.pricing_tiers.0,
            available_quantity: self.available_quantity,
            current_quantity_out: self.current_quantity_out,
            actual_available_quantity: stock.actual_available(),
            checkout_status: self.checkout_status,
            maintenance_status,
            next_maintenance_date: self.next_maintenance_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Equipment item as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub tags: Vec<String>,
    pub pricing_tiers: Vec<PricingTier>,
    /// Total units owned
    pub available_quantity: i32,
    /// Units allocated to approved or checked-out requests
    pub current_quantity_out: i32,
    /// `available_quantity - current_quantity_out`
    pub actual_available_quantity: i32,
    pub checkout_status: EquipmentStatus,
    pub maintenance_status: MaintenanceStatus,
    pub next_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Locked stock snapshot used inside transactions
#[derive(Debug, Clone, FromRow)]
pub struct StockRow {
    pub id: i32,
    pub name: String,
    pub available_quantity: i32,
    pub current_quantity_out: i32,
    pub checkout_status: EquipmentStatus,
}

impl StockRow {
    pub fn stock(&self) -> Stock {
        Stock {
            total: self.available_quantity,
            out: self.current_quantity_out,
            status: self.checkout_status,
        }
    }
}

/// Unit accounting for one equipment item.
///
/// Invariant: `0 <= out <= total`. Every transition returns a new value and
/// recomputes `status`; blocking statuses (maintenance, damaged, retired) are
/// kept until staff or a maintenance record clears them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stock {
    pub total: i32,
    pub out: i32,
    pub status: EquipmentStatus,
}

impl Stock {
    pub fn new(total: i32) -> Self {
        Self {
            total,
            out: 0,
            status: EquipmentStatus::Available,
        }
    }

    pub fn actual_available(&self) -> i32 {
        (self.total - self.out).max(0)
    }

    /// Status implied by the unit counts, unless a blocking status is set
    fn settle(self) -> Self {
        let status = if self.status.is_blocking() {
            self.status
        } else if self.total > 0 && self.out >= self.total {
            EquipmentStatus::CheckedOut
        } else {
            EquipmentStatus::Available
        };
        Self { status, ..self }
    }

    /// Check that `quantity` units could be allocated right now
    pub fn ensure_available(&self, name: &str, quantity: i32) -> AppResult<()> {
        if quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Quantity for {} must be at least 1",
                name
            )));
        }
        if self.status.is_blocking() {
            return Err(AppError::Validation(format!(
                "{} is not available for checkout (status: {})",
                name, self.status
            )));
        }
        if quantity > self.actual_available() {
            return Err(AppError::Validation(format!(
                "Insufficient quantity for {}: requested {}, available {}",
                name,
                quantity,
                self.actual_available()
            )));
        }
        Ok(())
    }

    /// Reserve `quantity` units
    pub fn allocate(self, name: &str, quantity: i32) -> AppResult<Self> {
        self.ensure_available(name, quantity)?;
        Ok(Self {
            out: self.out + quantity,
            ..self
        }
        .settle())
    }

    /// Give back `quantity` units and apply the reported condition
    pub fn release(self, quantity: i32, condition: ReturnCondition) -> Self {
        let out = (self.out - quantity.max(0)).max(0);
        let status = match (self.status, condition) {
            (EquipmentStatus::Retired, _) => EquipmentStatus::Retired,
            (_, ReturnCondition::Damaged) => EquipmentStatus::Damaged,
            (EquipmentStatus::Damaged, _) => EquipmentStatus::Damaged,
            (_, ReturnCondition::Poor) => EquipmentStatus::Maintenance,
            (current, _) => current,
        };
        Self { out, status, ..self }.settle()
    }

    /// Change the number of owned units
    pub fn resize(self, total: i32) -> AppResult<Self> {
        if total < 0 {
            return Err(AppError::Validation(
                "available_quantity cannot be negative".to_string(),
            ));
        }
        if total < self.out {
            return Err(AppError::Validation(format!(
                "available_quantity cannot be lower than the {} units currently out",
                self.out
            )));
        }
        Ok(Self { total, ..self }.settle())
    }

    /// Apply a status chosen by staff. `checked_out` belongs to the workflow.
    pub fn with_status(self, status: EquipmentStatus) -> AppResult<Self> {
        if status == EquipmentStatus::CheckedOut {
            return Err(AppError::Validation(
                "checked_out is set by the checkout workflow".to_string(),
            ));
        }
        Ok(Self { status, ..self }.settle())
    }

    /// An open maintenance record takes the item out of circulation
    pub fn begin_maintenance(self) -> Self {
        match self.status {
            EquipmentStatus::Retired => self,
            _ => Self {
                status: EquipmentStatus::Maintenance,
                ..self
            },
        }
    }

    /// A completed maintenance record clears the maintenance label
    pub fn end_maintenance(self) -> Self {
        match self.status {
            EquipmentStatus::Maintenance => Self {
                status: EquipmentStatus::Available,
                ..self
            }
            .settle(),
            _ => self,
        }
    }
}

/// Equipment list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Search by name (case-insensitive, partial)
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Filter by checkout status
    pub status: Option<EquipmentStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pricing_tiers: Vec<PricingTier>,
    /// Total units owned (defaults to 1)
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub available_quantity: Option<i32>,
}

/// Update equipment request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Category cannot be empty"))]
    pub category: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    /// An empty string clears the serial number
    pub serial_number: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pricing_tiers: Option<Vec<PricingTier>>,
    pub available_quantity: Option<i32>,
    pub checkout_status: Option<EquipmentStatus>,
}

/// Reject negative prices and blank tier labels
pub fn validate_pricing_tiers(tiers: &[PricingTier]) -> AppResult<()> {
    for tier in tiers {
        if tier.label.trim().is_empty() {
            return Err(AppError::Validation("Pricing tier label is required".to_string()));
        }
        if tier.price.is_sign_negative() {
            return Err(AppError::Validation(format!(
                "Pricing tier {} has a negative price",
                tier.label
            )));
        }
    }
    Ok(())
}

/// Trim tags, drop empty ones and duplicates (case-insensitive), keep first spelling
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(total: i32, out: i32, status: EquipmentStatus) -> Stock {
        Stock { total, out, status }
    }

    #[test]
    fn test_actual_available_never_negative() {
        assert_eq!(stock(5, 3, EquipmentStatus::Available).actual_available(), 2);
        assert_eq!(stock(2, 5, EquipmentStatus::Available).actual_available(), 0);
    }

    #[test]
    fn test_allocate_flips_to_checked_out_when_full() {
        let s = Stock::new(3).allocate("Mic", 2).unwrap();
        assert_eq!(s.out, 2);
        assert_eq!(s.status, EquipmentStatus::Available);

        let s = s.allocate("Mic", 1).unwrap();
        assert_eq!(s.out, 3);
        assert_eq!(s.status, EquipmentStatus::CheckedOut);
    }

    #[test]
    fn test_allocate_over_capacity_fails_without_mutation() {
        let s = stock(5, 3, EquipmentStatus::Available);
        let err = s.allocate("Camera", 3).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(s.out, 3);
    }

    #[test]
    fn test_allocate_rejects_zero_and_blocking() {
        assert!(Stock::new(5).allocate("Light", 0).is_err());
        assert!(stock(5, 0, EquipmentStatus::Maintenance).allocate("Light", 1).is_err());
        assert!(stock(5, 0, EquipmentStatus::Retired).allocate("Light", 1).is_err());
    }

    #[test]
    fn test_release_by_condition() {
        let out = stock(2, 2, EquipmentStatus::CheckedOut);

        let s = out.release(2, ReturnCondition::Good);
        assert_eq!((s.out, s.status), (0, EquipmentStatus::Available));

        let s = out.release(2, ReturnCondition::Poor);
        assert_eq!((s.out, s.status), (0, EquipmentStatus::Maintenance));

        let s = out.release(2, ReturnCondition::Damaged);
        assert_eq!((s.out, s.status), (0, EquipmentStatus::Damaged));

        let s = stock(2, 2, EquipmentStatus::Retired).release(2, ReturnCondition::Damaged);
        assert_eq!(s.status, EquipmentStatus::Retired);
    }

    #[test]
    fn test_partial_release_keeps_other_holders() {
        // two requests of 1 unit each on a 2-unit item
        let s = Stock::new(2).allocate("Tripod", 1).unwrap().allocate("Tripod", 1).unwrap();
        assert_eq!(s.status, EquipmentStatus::CheckedOut);

        let s = s.release(1, ReturnCondition::Excellent);
        assert_eq!(s.out, 1);
        assert_eq!(s.status, EquipmentStatus::Available);
    }

    #[test]
    fn test_release_never_goes_below_zero() {
        let s = stock(3, 1, EquipmentStatus::Available).release(4, ReturnCondition::Good);
        assert_eq!(s.out, 0);
    }

    #[test]
    fn test_checkout_scenario() {
        // 5 owned, request 3, approve, second request of 3 fails, return all
        let s = Stock::new(5);
        s.ensure_available("Camera", 3).unwrap();
        let s = s.allocate("Camera", 3).unwrap();
        assert_eq!(s.out, 3);
        assert_eq!(s.actual_available(), 2);

        assert!(s.ensure_available("Camera", 3).is_err());
        assert!(s.allocate("Camera", 3).is_err());

        let s = s.release(3, ReturnCondition::Good);
        assert_eq!(s.out, 0);
        assert_eq!(s.status, EquipmentStatus::Available);
    }

    #[test]
    fn test_out_stays_within_bounds_over_sequences() {
        let mut s = Stock::new(4);
        let ops: [(bool, i32); 8] = [
            (true, 2), (true, 3), (true, 2), (false, 1),
            (true, 1), (false, 5), (true, 4), (true, 1),
        ];
        for (allocate, qty) in ops {
            s = if allocate {
                s.allocate("Cable", qty).unwrap_or(s)
            } else {
                s.release(qty, ReturnCondition::Good)
            };
            assert!(s.out >= 0 && s.out <= s.total, "out of bounds: {:?}", s);
        }
    }

    #[test]
    fn test_resize() {
        let s = stock(5, 3, EquipmentStatus::Available);
        assert!(s.resize(2).is_err());
        assert!(s.resize(-1).is_err());
        assert_eq!(s.resize(3).unwrap().status, EquipmentStatus::CheckedOut);
        assert_eq!(s.resize(10).unwrap().status, EquipmentStatus::Available);
    }

    #[test]
    fn test_with_status() {
        let s = stock(2, 2, EquipmentStatus::Damaged);
        assert!(s.with_status(EquipmentStatus::CheckedOut).is_err());
        assert_eq!(
            s.with_status(EquipmentStatus::Available).unwrap().status,
            EquipmentStatus::CheckedOut
        );
        assert_eq!(
            s.with_status(EquipmentStatus::Retired).unwrap().status,
            EquipmentStatus::Retired
        );
    }

    #[test]
    fn test_maintenance_labels() {
        let s = stock(2, 1, EquipmentStatus::Available).begin_maintenance();
        assert_eq!(s.status, EquipmentStatus::Maintenance);
        assert_eq!(s.end_maintenance().status, EquipmentStatus::Available);

        let retired = stock(1, 0, EquipmentStatus::Retired);
        assert_eq!(retired.begin_maintenance().status, EquipmentStatus::Retired);

        let damaged = stock(1, 0, EquipmentStatus::Damaged);
        assert_eq!(damaged.end_maintenance().status, EquipmentStatus::Damaged);
    }

    #[test]
    fn test_pricing_validation() {
        let ok = PricingTier {
            label: "Daily".into(),
            period: PricingPeriod::Day,
            price: Decimal::new(4500, 2),
        };
        let negative = PricingTier {
            price: Decimal::new(-1, 0),
            ..ok.clone()
        };
        assert!(validate_pricing_tiers(&[ok.clone()]).is_ok());
        assert!(validate_pricing_tiers(&[ok, negative]).is_err());
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" 4k ".to_string(), "".to_string(), "4K".to_string(), "cinema".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["4k".to_string(), "cinema".to_string()]);
    }
}
