//! Maintenance log repository

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        activity::{actions, entities, NewActivity},
        enums::MaintenanceRecordStatus,
        maintenance::{CreateMaintenanceRecord, HistoryState, MaintenanceRecord},
    },
};

use super::{activities::ActivitiesRepository, equipment::EquipmentRepository};

/// Status of an item's latest non-scheduled maintenance record, the SQL
/// side of `HistoryState::work_status`. Expects the equipment row aliased `e`.
pub const WORK_STATUS_SQL: &str = r#"(SELECT m.status FROM maintenance_records m
            WHERE m.equipment_id = e.id AND m.status <> 'scheduled'
            ORDER BY m.performed_date DESC, m.id DESC
            LIMIT 1)"#;

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: Pool<Postgres>,
}

impl MaintenanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Maintenance history of an item, newest first
    pub async fn list_for_equipment(&self, equipment_id: i32) -> AppResult<Vec<MaintenanceRecord>> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            SELECT * FROM maintenance_records
            WHERE equipment_id = $1
            ORDER BY performed_date DESC, id DESC
            "#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Append a record and sync the item's next maintenance date and status
    /// with its history
    pub async fn append(
        &self,
        equipment_id: i32,
        actor_id: i32,
        data: &CreateMaintenanceRecord,
        performed_date: NaiveDate,
        status: MaintenanceRecordStatus,
    ) -> AppResult<MaintenanceRecord> {
        let mut tx = self.pool.begin().await?;

        let item = EquipmentRepository::lock_stock(&mut tx, &[equipment_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))?;

        let record = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            INSERT INTO maintenance_records (equipment_id, maintenance_type, description, cost,
                                             performed_by, performed_date, next_maintenance_date,
                                             status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(equipment_id)
        .bind(data.maintenance_type)
        .bind(data.description.trim())
        .bind(data.cost)
        .bind(&data.performed_by)
        .bind(performed_date)
        .bind(data.next_maintenance_date)
        .bind(status)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        let history = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT * FROM maintenance_records WHERE equipment_id = $1",
        )
        .bind(equipment_id)
        .fetch_all(&mut *tx)
        .await?;
        let state = HistoryState::from_records(&history);

        let stock = match state.work_status {
            Some(MaintenanceRecordStatus::InProgress) => item.stock().begin_maintenance(),
            Some(MaintenanceRecordStatus::Completed) => item.stock().end_maintenance(),
            _ => item.stock(),
        };
        EquipmentRepository::save_stock(&mut tx, equipment_id, &stock).await?;

        sqlx::query("UPDATE equipment SET next_maintenance_date = $2 WHERE id = $1")
            .bind(equipment_id)
            .bind(state.next_maintenance_date)
            .execute(&mut *tx)
            .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::MAINTENANCE_LOGGED,
                entities::EQUIPMENT,
                equipment_id,
                format!("Logged {} maintenance on {}", record.maintenance_type, item.name),
            )
            .details(serde_json::json!({
                "maintenance_record_id": record.id,
                "status": record.status,
                "cost": record.cost.map(|c| c.to_string()),
                "next_maintenance_date": record.next_maintenance_date,
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_status_skips_scheduled_records() {
        assert!(WORK_STATUS_SQL.contains("m.status <> 'scheduled'"));
        assert!(WORK_STATUS_SQL.contains("ORDER BY m.performed_date DESC, m.id DESC"));
        assert!(WORK_STATUS_SQL.trim_start().starts_with('(') && WORK_STATUS_SQL.trim_end().ends_with(')'));
    }
}
