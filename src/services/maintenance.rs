//! Maintenance log service

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{MaintenanceRecordStatus, NotificationPriority, RelatedEntity, Role},
        maintenance::{CreateMaintenanceRecord, MaintenanceRecord},
        notification::NewNotification,
        user::UserClaims,
    },
    repository::Repository,
    services::notifications::NotificationsService,
};

const MAINTENANCE_WATCHERS: &[Role] = &[Role::SuperAdmin, Role::DepartmentAdmin];

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
    notifications: NotificationsService,
}

impl MaintenanceService {
    pub fn new(repository: Repository, notifications: NotificationsService) -> Self {
        Self { repository, notifications }
    }

    pub async fn list(&self, equipment_id: i32) -> AppResult<Vec<MaintenanceRecord>> {
        self.repository.equipment.get_by_id(equipment_id).await?;
        self.repository.maintenance.list_for_equipment(equipment_id).await
    }

    pub async fn append(
        &self,
        claims: &UserClaims,
        equipment_id: i32,
        data: CreateMaintenanceRecord,
    ) -> AppResult<MaintenanceRecord> {
        data.validate()?;
        data.check()?;

        let performed_date = data.performed_date.unwrap_or_else(|| Utc::now().date_naive());
        if matches!(data.next_maintenance_date, Some(next) if next < performed_date) {
            return Err(AppError::Validation(
                "next_maintenance_date cannot be before performed_date".to_string(),
            ));
        }
        let status = data.status.unwrap_or(MaintenanceRecordStatus::Completed);

        let record = self
            .repository
            .maintenance
            .append(equipment_id, claims.user_id, &data, performed_date, status)
            .await?;
        tracing::info!(
            equipment_id,
            maintenance_record_id = record.id,
            maintenance_type = %record.maintenance_type,
            status = %record.status,
            "Maintenance logged"
        );

        if record.status == MaintenanceRecordStatus::InProgress {
            let item = self.repository.equipment.get_by_id(equipment_id).await?;
            self.notifications
                .notify_roles(MAINTENANCE_WATCHERS, Some(claims.user_id), |recipient| {
                    NewNotification::new(
                        recipient,
                        "Equipment in maintenance",
                        format!("{} is out of circulation: {}", item.name, record.description),
                    )
                    .priority(NotificationPriority::High)
                    .related(RelatedEntity::Equipment, equipment_id)
                })
                .await;
        }

        Ok(record)
    }
}
