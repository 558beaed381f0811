//! Checkout record model and the checkout state machine

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{CheckoutStatus, ReturnCondition};
use crate::error::{AppError, AppResult};

/// Stored status → status shown to clients.
///
/// A record that is still `checked_out` after its expected return date is
/// reported as `overdue`. This is the single source of that rule.
pub fn effective_status(
    stored: CheckoutStatus,
    expected_return_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CheckoutStatus {
    match stored {
        CheckoutStatus::CheckedOut if now > expected_return_date => CheckoutStatus::Overdue,
        other => other,
    }
}

impl CheckoutStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutStatus::Returned | CheckoutStatus::Cancelled)
    }

    /// Whether the record still holds equipment units
    pub fn holds_units(&self) -> bool {
        matches!(
            self,
            CheckoutStatus::Approved | CheckoutStatus::CheckedOut | CheckoutStatus::Overdue
        )
    }

    pub fn can_transition_to(&self, next: CheckoutStatus) -> bool {
        use CheckoutStatus::*;
        matches!(
            (self, next),
            (PendingApproval, Approved)
                | (PendingApproval, Cancelled)
                | (Approved, CheckedOut)
                | (CheckedOut, Returned)
                | (CheckedOut, Overdue)
                | (Overdue, Returned)
        )
    }

    pub fn ensure_transition(&self, next: CheckoutStatus) -> AppResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Cannot move checkout from {} to {}",
                self, next
            )))
        }
    }
}

/// Checkout record row from database
#[derive(Debug, Clone, FromRow)]
pub struct CheckoutRecordRow {
    pub id: i32,
    pub requester_id: i32,
    pub requester_name: Option<String>,
    pub purpose: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub expected_return_date: DateTime<Utc>,
    pub status: CheckoutStatus,
    pub approver_id: Option<i32>,
    pub approver_name: Option<String>,
    pub approval_notes: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub return_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutRecordRow {
    pub fn into_record(self, items: Vec<CheckoutLine>, now: DateTime<Utc>) -> CheckoutRecord {
        let status = effective_status(self.status, self.expected_return_date, now);
        CheckoutRecord {
            id: self.id,
            requester_id: self.requester_id,
            requester_name: self.requester_name,
            purpose: self.purpose,
            location: self.location,
            notes: self.notes,
            expected_return_date: self.expected_return_date,
            status,
            is_overdue: status == CheckoutStatus::Overdue,
            approver_id: self.approver_id,
            approver_name: self.approver_name,
            approval_notes: self.approval_notes,
            approved_at: self.approved_at,
            checked_out_at: self.checked_out_at,
            returned_at: self.returned_at,
            cancelled_at: self.cancelled_at,
            return_notes: self.return_notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Checkout line item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CheckoutLine {
    pub id: i32,
    pub checkout_id: i32,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub quantity: i32,
    pub return_condition: Option<ReturnCondition>,
    pub return_notes: Option<String>,
}

/// Checkout record with its line items, as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRecord {
    pub id: i32,
    pub requester_id: i32,
    pub requester_name: Option<String>,
    pub purpose: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub expected_return_date: DateTime<Utc>,
    /// Effective status (`overdue` is derived, never stored)
    pub status: CheckoutStatus,
    pub is_overdue: bool,
    pub approver_id: Option<i32>,
    pub approver_name: Option<String>,
    pub approval_notes: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub return_notes: Option<String>,
    pub items: Vec<CheckoutLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutRecord {
    pub fn total_units(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Requested equipment line
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutLineRequest {
    pub equipment_id: i32,
    pub quantity: i32,
}

/// Checkout request body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCheckout {
    #[validate(length(min = 1, message = "At least one equipment item is required"))]
    pub items: Vec<CheckoutLineRequest>,
    #[validate(length(min = 1, message = "Purpose is required"))]
    pub purpose: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub expected_return_date: DateTime<Utc>,
}

impl CreateCheckout {
    /// Field checks that do not need the database
    pub fn check(&self, now: DateTime<Utc>) -> AppResult<()> {
        if self.purpose.trim().is_empty() {
            return Err(AppError::Validation("Purpose is required".to_string()));
        }
        if self.expected_return_date <= now {
            return Err(AppError::Validation(
                "Expected return date must be in the future".to_string(),
            ));
        }
        validate_lines(&self.items)
    }
}

/// At least one line, positive quantities, each item listed once
pub fn validate_lines(lines: &[CheckoutLineRequest]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::Validation(
            "At least one equipment item is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Quantity for equipment {} must be at least 1",
                line.equipment_id
            )));
        }
        if !seen.insert(line.equipment_id) {
            return Err(AppError::Validation(format!(
                "Equipment {} is listed more than once",
                line.equipment_id
            )));
        }
    }
    Ok(())
}

/// Approve or reject a pending request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveCheckout {
    pub approved: bool,
    pub notes: Option<String>,
}

/// Cancel a pending request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelCheckout {
    pub reason: Option<String>,
}

/// Condition reported for one returned line
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnLine {
    pub equipment_id: i32,
    pub condition: ReturnCondition,
    pub notes: Option<String>,
}

/// Return body; lines not listed are recorded in `good` condition
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnCheckout {
    #[serde(default)]
    pub items: Vec<ReturnLine>,
    pub notes: Option<String>,
}

/// Outcome of matching reported conditions to a record's lines
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReturn {
    pub line_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    pub condition: ReturnCondition,
    pub notes: Option<String>,
}

/// Pair every line of the record with its reported (or default) condition.
/// Each item may be reported at most once.
pub fn resolve_return(lines: &[CheckoutLine], reported: &[ReturnLine]) -> AppResult<Vec<ResolvedReturn>> {
    let known: HashSet<i32> = lines.iter().map(|l| l.equipment_id).collect();
    let mut seen = HashSet::new();
    for report in reported {
        if !known.contains(&report.equipment_id) {
            return Err(AppError::Validation(format!(
                "Equipment {} is not part of this checkout",
                report.equipment_id
            )));
        }
        if !seen.insert(report.equipment_id) {
            return Err(AppError::Validation(format!(
                "Equipment {} is reported more than once",
                report.equipment_id
            )));
        }
    }

    Ok(lines
        .iter()
        .map(|line| {
            let report = reported.iter().find(|r| r.equipment_id == line.equipment_id);
            ResolvedReturn {
                line_id: line.id,
                equipment_id: line.equipment_id,
                quantity: line.quantity,
                condition: report.map(|r| r.condition).unwrap_or_default(),
                notes: report.and_then(|r| r.notes.clone()),
            }
        })
        .collect())
}

/// Checkout list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct CheckoutQuery {
    /// Effective status (`overdue` and `checked_out` are told apart by date)
    pub status: Option<CheckoutStatus>,
    pub requester_id: Option<i32>,
    pub equipment_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn line(id: i32, equipment_id: i32, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            id,
            checkout_id: 1,
            equipment_id,
            equipment_name: format!("Item {}", equipment_id),
            quantity,
            return_condition: None,
            return_notes: None,
        }
    }

    #[test]
    fn test_transitions() {
        use CheckoutStatus::*;
        assert!(PendingApproval.can_transition_to(Approved));
        assert!(PendingApproval.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(CheckedOut));
        assert!(CheckedOut.can_transition_to(Returned));
        assert!(CheckedOut.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Returned));

        assert!(!Approved.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Returned));
        assert!(!PendingApproval.can_transition_to(CheckedOut));
        assert!(!Returned.can_transition_to(CheckedOut));
        assert!(!Cancelled.can_transition_to(Approved));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for from in CheckoutStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in CheckoutStatus::ALL {
                assert!(!from.can_transition_to(*to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_invalid_transition_is_conflict() {
        let err = CheckoutStatus::Returned
            .ensure_transition(CheckoutStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_overdue_is_derived() {
        let now = Utc::now();
        let past = now - Duration::hours(1);
        let future = now + Duration::hours(1);

        assert_eq!(effective_status(CheckoutStatus::CheckedOut, past, now), CheckoutStatus::Overdue);
        assert_eq!(effective_status(CheckoutStatus::CheckedOut, future, now), CheckoutStatus::CheckedOut);
        assert_eq!(effective_status(CheckoutStatus::Approved, past, now), CheckoutStatus::Approved);
        assert_eq!(effective_status(CheckoutStatus::Returned, past, now), CheckoutStatus::Returned);
    }

    #[test]
    fn test_row_into_record_flags_overdue() {
        let now = Utc::now();
        let row = CheckoutRecordRow {
            id: 7,
            requester_id: 3,
            requester_name: Some("Ada".into()),
            purpose: "Shoot".into(),
            location: None,
            notes: None,
            expected_return_date: now - Duration::days(1),
            status: CheckoutStatus::CheckedOut,
            approver_id: Some(1),
            approver_name: None,
            approval_notes: None,
            approved_at: None,
            checked_out_at: None,
            returned_at: None,
            cancelled_at: None,
            return_notes: None,
            created_at: now,
            updated_at: now,
        };
        let record = row.into_record(vec![line(1, 10, 2), line(2, 11, 1)], now);
        assert_eq!(record.status, CheckoutStatus::Overdue);
        assert!(record.is_overdue);
        assert!(record.status.holds_units());
        assert_eq!(record.total_units(), 3);
    }

    #[test]
    fn test_validate_lines() {
        let ok = vec![
            CheckoutLineRequest { equipment_id: 1, quantity: 2 },
            CheckoutLineRequest { equipment_id: 2, quantity: 1 },
        ];
        assert!(validate_lines(&ok).is_ok());
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[CheckoutLineRequest { equipment_id: 1, quantity: 0 }]).is_err());

        let dup = vec![
            CheckoutLineRequest { equipment_id: 1, quantity: 1 },
            CheckoutLineRequest { equipment_id: 1, quantity: 1 },
        ];
        assert!(validate_lines(&dup).is_err());
    }

    #[test]
    fn test_request_requires_future_return() {
        let now = Utc::now();
        let mut req = CreateCheckout {
            items: vec![CheckoutLineRequest { equipment_id: 1, quantity: 1 }],
            purpose: "Podcast".into(),
            location: Some("Studio B".into()),
            notes: None,
            expected_return_date: now - Duration::minutes(5),
        };
        assert!(req.check(now).is_err());

        req.expected_return_date = now + Duration::days(2);
        assert!(req.check(now).is_ok());

        req.purpose = "   ".into();
        assert!(req.check(now).is_err());
    }

    #[test]
    fn test_resolve_return_defaults_to_good() {
        let lines = vec![line(1, 10, 2), line(2, 11, 1)];
        let reported = vec![ReturnLine {
            equipment_id: 11,
            condition: ReturnCondition::Damaged,
            notes: Some("cracked lens".into()),
        }];

        let resolved = resolve_return(&lines, &reported).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].condition, ReturnCondition::Good);
        assert_eq!(resolved[1].condition, ReturnCondition::Damaged);
        assert_eq!(resolved[1].notes.as_deref(), Some("cracked lens"));
    }

    #[test]
    fn test_resolve_return_rejects_foreign_items() {
        let lines = vec![line(1, 10, 2)];
        let reported = vec![ReturnLine {
            equipment_id: 99,
            condition: ReturnCondition::Good,
            notes: None,
        }];
        assert!(resolve_return(&lines, &reported).is_err());
    }

    #[test]
    fn test_resolve_return_rejects_duplicate_reports() {
        let lines = vec![line(1, 10, 2)];
        let report = |condition| ReturnLine {
            equipment_id: 10,
            condition,
            notes: None,
        };
        let reported = vec![report(ReturnCondition::Good), report(ReturnCondition::Damaged)];
        assert!(matches!(resolve_return(&lines, &reported), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_checkout_derive_validation() {
        let req = CreateCheckout {
            items: vec![],
            purpose: "Interview".into(),
            location: None,
            notes: None,
            expected_return_date: Utc::now() + Duration::days(1),
        };
        assert!(req.validate().is_err());

        let req = CreateCheckout {
            items: vec![CheckoutLineRequest { equipment_id: 4, quantity: 2 }],
            ..req
        };
        assert!(req.validate().is_ok());
    }
}
