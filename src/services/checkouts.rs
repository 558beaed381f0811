//! Checkout workflow service

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        checkout::{ApproveCheckout, CancelCheckout, CheckoutQuery, CheckoutRecord, CreateCheckout, ReturnCheckout},
        enums::{CheckoutStatus, NotificationPriority, RelatedEntity, ReturnCondition, Role},
        notification::NewNotification,
        user::UserClaims,
    },
    repository::Repository,
    services::notifications::NotificationsService,
};

const APPROVER_ROLES: &[Role] = &[Role::SuperAdmin, Role::DepartmentAdmin];

#[derive(Clone)]
pub struct CheckoutsService {
    repository: Repository,
    notifications: NotificationsService,
}

impl CheckoutsService {
    pub fn new(repository: Repository, notifications: NotificationsService) -> Self {
        Self { repository, notifications }
    }

    /// Clients only see their own records
    fn ensure_visible(claims: &UserClaims, record: &CheckoutRecord) -> AppResult<()> {
        if claims.role.is_staff() || record.requester_id == claims.user_id {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Checkout {} belongs to another user",
                record.id
            )))
        }
    }

    fn about(record: &CheckoutRecord, recipient_id: i32, title: &str, message: String) -> NewNotification {
        NewNotification::new(recipient_id, title, message).related(RelatedEntity::Checkout, record.id)
    }

    pub async fn list(
        &self,
        claims: &UserClaims,
        mut query: CheckoutQuery,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<CheckoutRecord>, i64)> {
        if !claims.role.is_staff() {
            query.requester_id = Some(claims.user_id);
        }
        self.repository.checkouts.search(&query, Utc::now(), page, per_page).await
    }

    /// Records past their expected return date
    pub async fn overdue(&self, page: i64, per_page: i64) -> AppResult<(Vec<CheckoutRecord>, i64)> {
        let query = CheckoutQuery {
            status: Some(CheckoutStatus::Overdue),
            ..Default::default()
        };
        self.repository.checkouts.search(&query, Utc::now(), page, per_page).await
    }

    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<CheckoutRecord> {
        let record = self.repository.checkouts.get_by_id(id, Utc::now()).await?;
        Self::ensure_visible(claims, &record)?;
        Ok(record)
    }

    /// Checkout history of one equipment item
    pub async fn for_equipment(&self, equipment_id: i32, page: i64, per_page: i64) -> AppResult<(Vec<CheckoutRecord>, i64)> {
        self.repository.equipment.get_by_id(equipment_id).await?;
        let query = CheckoutQuery {
            equipment_id: Some(equipment_id),
            ..Default::default()
        };
        self.repository.checkouts.search(&query, Utc::now(), page, per_page).await
    }

    pub async fn request(&self, claims: &UserClaims, data: CreateCheckout) -> AppResult<CheckoutRecord> {
        data.validate()?;
        data.check(Utc::now())?;

        let id = self.repository.checkouts.create(claims.user_id, &data).await?;
        let record = self.repository.checkouts.get_by_id(id, Utc::now()).await?;
        tracing::info!(
            checkout_id = id,
            requester_id = claims.user_id,
            units = record.total_units(),
            "Checkout requested"
        );

        let requester = record.requester_name.clone().unwrap_or_else(|| claims.sub.clone());
        self.notifications
            .notify_roles(APPROVER_ROLES, Some(claims.user_id), |recipient| {
                Self::about(
                    &record,
                    recipient,
                    "Checkout request awaiting approval",
                    format!(
                        "{} requested {} unit(s) for \"{}\" (checkout #{})",
                        requester,
                        record.total_units(),
                        record.purpose,
                        record.id
                    ),
                )
            })
            .await;

        Ok(record)
    }

    pub async fn approve(&self, claims: &UserClaims, id: i32, data: ApproveCheckout) -> AppResult<CheckoutRecord> {
        self.repository
            .checkouts
            .approve(id, claims.user_id, data.approved, data.notes.as_deref())
            .await?;
        let record = self.repository.checkouts.get_by_id(id, Utc::now()).await?;
        tracing::info!(checkout_id = id, approver_id = claims.user_id, approved = data.approved, "Checkout reviewed");

        let notification = if data.approved {
            Self::about(
                &record,
                record.requester_id,
                "Checkout approved",
                format!("Your checkout request #{} was approved", record.id),
            )
        } else {
            Self::about(
                &record,
                record.requester_id,
                "Checkout rejected",
                match data.notes.as_deref() {
                    Some(notes) => format!("Your checkout request #{} was rejected: {}", record.id, notes),
                    None => format!("Your checkout request #{} was rejected", record.id),
                },
            )
            .priority(NotificationPriority::High)
        };
        self.notifications.notify_all(vec![notification]).await;

        Ok(record)
    }

    /// The requester or an approver may cancel a pending request
    pub async fn cancel(&self, claims: &UserClaims, id: i32, data: CancelCheckout) -> AppResult<CheckoutRecord> {
        let record = self.get(claims, id).await?;
        if record.requester_id != claims.user_id && !claims.role.can_approve_checkouts() {
            return Err(AppError::Authorization(
                "Only the requester or an approver can cancel a checkout".to_string(),
            ));
        }

        self.repository
            .checkouts
            .cancel(id, claims.user_id, data.reason.as_deref())
            .await?;
        let record = self.repository.checkouts.get_by_id(id, Utc::now()).await?;
        tracing::info!(checkout_id = id, actor_id = claims.user_id, "Checkout cancelled");

        if record.requester_id != claims.user_id {
            self.notifications
                .notify_all(vec![Self::about(
                    &record,
                    record.requester_id,
                    "Checkout cancelled",
                    format!("Your checkout request #{} was cancelled", record.id),
                )])
                .await;
        }

        Ok(record)
    }

    pub async fn hand_off(&self, claims: &UserClaims, id: i32) -> AppResult<CheckoutRecord> {
        self.repository.checkouts.hand_off(id, claims.user_id).await?;
        let record = self.repository.checkouts.get_by_id(id, Utc::now()).await?;
        tracing::info!(checkout_id = id, actor_id = claims.user_id, "Equipment handed off");

        self.notifications
            .notify_all(vec![Self::about(
                &record,
                record.requester_id,
                "Equipment handed off",
                format!(
                    "Checkout #{} is now with you. Please return it by {}",
                    record.id,
                    record.expected_return_date.format("%Y-%m-%d %H:%M UTC")
                ),
            )])
            .await;

        Ok(record)
    }

    pub async fn return_equipment(&self, claims: &UserClaims, id: i32, data: ReturnCheckout) -> AppResult<CheckoutRecord> {
        let now = Utc::now();
        self.repository.checkouts.return_all(id, claims.user_id, &data, now).await?;
        let record = self.repository.checkouts.get_by_id(id, now).await?;
        tracing::info!(checkout_id = id, actor_id = claims.user_id, units = record.total_units(), "Equipment returned");

        let damaged = record
            .items
            .iter()
            .any(|line| matches!(line.return_condition, Some(ReturnCondition::Damaged | ReturnCondition::Poor)));
        let priority = if damaged {
            NotificationPriority::High
        } else {
            NotificationPriority::Medium
        };

        let mut recipients = vec![record.requester_id];
        if let Some(approver_id) = record.approver_id {
            if approver_id != record.requester_id {
                recipients.push(approver_id);
            }
        }

        let batch = recipients
            .into_iter()
            .map(|recipient| {
                Self::about(
                    &record,
                    recipient,
                    "Equipment returned",
                    if damaged {
                        format!("Checkout #{} was returned with items needing attention", record.id)
                    } else {
                        format!("Checkout #{} was returned", record.id)
                    },
                )
                .priority(priority)
            })
            .collect();
        self.notifications.notify_all(batch).await;

        Ok(record)
    }
}
