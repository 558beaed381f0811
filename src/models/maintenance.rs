//! Maintenance log model and maintenance status derivation

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{MaintenanceRecordStatus, MaintenanceStatus, MaintenanceType};
use crate::error::{AppError, AppResult};

/// Maintenance record. Records are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceRecord {
    pub id: i32,
    pub equipment_id: i32,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    #[schema(value_type = Option<String>, example = "120.00")]
    pub cost: Option<Decimal>,
    pub performed_by: Option<String>,
    pub performed_date: NaiveDate,
    pub next_maintenance_date: Option<NaiveDate>,
    pub status: MaintenanceRecordStatus,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Append maintenance record request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenanceRecord {
    pub maintenance_type: MaintenanceType,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub performed_by: Option<String>,
    /// Defaults to today
    pub performed_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    /// Defaults to `completed`
    pub status: Option<MaintenanceRecordStatus>,
}

impl CreateMaintenanceRecord {
    pub fn check(&self) -> AppResult<()> {
        if let Some(cost) = self.cost {
            if cost.is_sign_negative() {
                return Err(AppError::Validation("Cost cannot be negative".to_string()));
            }
        }
        if let (Some(performed), Some(next)) = (self.performed_date, self.next_maintenance_date) {
            if next < performed {
                return Err(AppError::Validation(
                    "next_maintenance_date cannot be before performed_date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Derive the maintenance label of an item.
///
/// `work_status` is the status of the latest non-scheduled record, so an
/// `in_progress` record keeps the item in maintenance until a `completed`
/// one closes it, whatever gets scheduled meanwhile. Otherwise the next
/// maintenance date is compared with `today`: past → overdue, within
/// `lookahead_days` → due soon, absent or later → up to date.
pub fn derive_maintenance_status(
    work_status: Option<MaintenanceRecordStatus>,
    next_maintenance_date: Option<NaiveDate>,
    today: NaiveDate,
    lookahead_days: i64,
) -> MaintenanceStatus {
    if work_status == Some(MaintenanceRecordStatus::InProgress) {
        return MaintenanceStatus::InMaintenance;
    }

    match next_maintenance_date {
        None => MaintenanceStatus::UpToDate,
        Some(date) if date < today => MaintenanceStatus::Overdue,
        Some(date) if date <= today + Duration::days(lookahead_days.max(0)) => {
            MaintenanceStatus::DueSoon
        }
        Some(_) => MaintenanceStatus::UpToDate,
    }
}

fn newest<'a>(records: impl Iterator<Item = &'a MaintenanceRecord>) -> Option<&'a MaintenanceRecord> {
    records.max_by_key(|r| (r.performed_date, r.id))
}

/// Inputs of [`derive_maintenance_status`] taken from a full history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    /// Status of the latest record that is not merely scheduled
    pub work_status: Option<MaintenanceRecordStatus>,
    /// Next date announced by the latest record of any status
    pub next_maintenance_date: Option<NaiveDate>,
}

impl HistoryState {
    /// Records are ordered by `performed_date`, then id
    pub fn from_records(records: &[MaintenanceRecord]) -> Self {
        Self {
            work_status: newest(
                records
                    .iter()
                    .filter(|r| r.status != MaintenanceRecordStatus::Scheduled),
            )
            .map(|r| r.status),
            next_maintenance_date: newest(records.iter()).and_then(|r| r.next_maintenance_date),
        }
    }

    pub fn maintenance_status(&self, today: NaiveDate, lookahead_days: i64) -> MaintenanceStatus {
        derive_maintenance_status(self.work_status, self.next_maintenance_date, today, lookahead_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn record(id: i32, performed: NaiveDate, next: Option<NaiveDate>, status: MaintenanceRecordStatus) -> MaintenanceRecord {
        MaintenanceRecord {
            id,
            equipment_id: 1,
            maintenance_type: MaintenanceType::Inspection,
            description: "check".to_string(),
            cost: None,
            performed_by: None,
            performed_date: performed,
            next_maintenance_date: next,
            status,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_date_based_status() {
        let t = today();
        let derive = |next: Option<NaiveDate>| derive_maintenance_status(None, next, t, 7);

        assert_eq!(derive(None), MaintenanceStatus::UpToDate);
        assert_eq!(derive(Some(t + Duration::days(1))), MaintenanceStatus::DueSoon);
        assert_eq!(derive(Some(t - Duration::days(1))), MaintenanceStatus::Overdue);
        assert_eq!(derive(Some(t)), MaintenanceStatus::DueSoon);
        assert_eq!(derive(Some(t + Duration::days(7))), MaintenanceStatus::DueSoon);
        assert_eq!(derive(Some(t + Duration::days(8))), MaintenanceStatus::UpToDate);
    }

    #[test]
    fn test_in_progress_overrides_dates() {
        let t = today();
        let status = derive_maintenance_status(
            Some(MaintenanceRecordStatus::InProgress),
            Some(t - Duration::days(30)),
            t,
            7,
        );
        assert_eq!(status, MaintenanceStatus::InMaintenance);
    }

    #[test]
    fn test_history_uses_latest_record() {
        let t = today();
        let history = vec![
            record(1, t - Duration::days(20), Some(t - Duration::days(2)), MaintenanceRecordStatus::Completed),
            record(2, t - Duration::days(5), None, MaintenanceRecordStatus::InProgress),
        ];
        assert_eq!(HistoryState::from_records(&history).maintenance_status(t, 7), MaintenanceStatus::InMaintenance);

        let mut history = history;
        history.push(record(3, t - Duration::days(5), Some(t + Duration::days(90)), MaintenanceRecordStatus::Completed));
        let state = HistoryState::from_records(&history);
        assert_eq!(state.work_status, Some(MaintenanceRecordStatus::Completed));
        assert_eq!(state.maintenance_status(t, 7), MaintenanceStatus::UpToDate);
    }

    #[test]
    fn test_scheduled_record_does_not_close_open_work() {
        let t = today();
        let history = vec![
            record(1, t, None, MaintenanceRecordStatus::InProgress),
            record(2, t + Duration::days(1), Some(t + Duration::days(60)), MaintenanceRecordStatus::Scheduled),
        ];
        let state = HistoryState::from_records(&history);
        assert_eq!(state.work_status, Some(MaintenanceRecordStatus::InProgress));
        assert_eq!(state.next_maintenance_date, Some(t + Duration::days(60)));
        assert_eq!(state.maintenance_status(t, 7), MaintenanceStatus::InMaintenance);
    }

    #[test]
    fn test_only_scheduled_records_follow_dates() {
        let t = today();
        let history = vec![record(1, t, Some(t + Duration::days(3)), MaintenanceRecordStatus::Scheduled)];
        let state = HistoryState::from_records(&history);
        assert_eq!(state.work_status, None);
        assert_eq!(state.maintenance_status(t, 7), MaintenanceStatus::DueSoon);
    }

    #[test]
    fn test_empty_history_is_up_to_date() {
        let state = HistoryState::from_records(&[]);
        assert_eq!(state.work_status, None);
        assert_eq!(state.maintenance_status(today(), 7), MaintenanceStatus::UpToDate);
    }

    #[test]
    fn test_request_checks() {
        let req = CreateMaintenanceRecord {
            maintenance_type: MaintenanceType::Repair,
            description: "Replace fan".to_string(),
            cost: Some(Decimal::new(-500, 2)),
            performed_by: None,
            performed_date: None,
            next_maintenance_date: None,
            status: None,
        };
        assert!(req.check().is_err());

        let req = CreateMaintenanceRecord {
            cost: Some(Decimal::new(500, 2)),
            performed_date: Some(today()),
            next_maintenance_date: Some(today() - Duration::days(1)),
            ..req
        };
        assert!(req.check().is_err());
    }
}
