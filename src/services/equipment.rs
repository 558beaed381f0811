//! Equipment catalog service

use chrono::{Duration, NaiveDate, Utc};
use validator::Validate;

use crate::{
    config::EquipmentConfig,
    error::AppResult,
    models::{
        enums::MaintenanceStatus,
        equipment::{validate_pricing_tiers, CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    config: EquipmentConfig,
}

impl EquipmentService {
    pub fn new(repository: Repository, config: EquipmentConfig) -> Self {
        Self { repository, config }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub fn lookahead_days(&self) -> i64 {
        self.config.maintenance_lookahead_days
    }

    pub async fn search(&self, query: &EquipmentQuery, page: i64, per_page: i64) -> AppResult<(Vec<Equipment>, i64)> {
        let (rows, total) = self.repository.equipment.search(query, page, per_page).await?;
        let today = Self::today();
        let items = rows
            .into_iter()
            .map(|row| row.into_equipment(today, self.lookahead_days()))
            .collect();
        Ok((items, total))
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.equipment.categories().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        let row = self.repository.equipment.get_by_id(id).await?;
        Ok(row.into_equipment(Self::today(), self.lookahead_days()))
    }

    pub async fn create(&self, actor_id: i32, data: &CreateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        validate_pricing_tiers(&data.pricing_tiers)?;

        let row = self.repository.equipment.create(actor_id, data).await?;
        tracing::info!(equipment_id = row.id, name = %row.name, units = row.available_quantity, "Equipment created");
        Ok(row.into_equipment(Self::today(), self.lookahead_days()))
    }

    pub async fn update(&self, actor_id: i32, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        if let Some(ref tiers) = data.pricing_tiers {
            validate_pricing_tiers(tiers)?;
        }

        let row = self.repository.equipment.update(actor_id, id, data).await?;
        tracing::info!(equipment_id = id, status = %row.checkout_status, "Equipment updated");
        Ok(row.into_equipment(Self::today(), self.lookahead_days()))
    }

    pub async fn delete(&self, actor_id: i32, id: i32) -> AppResult<()> {
        self.repository.equipment.delete(actor_id, id).await?;
        tracing::info!(equipment_id = id, "Equipment deleted");
        Ok(())
    }

    /// Items whose derived maintenance status needs attention within `days`
    /// (defaults to the configured lookahead)
    pub async fn maintenance_due(&self, days: Option<i64>) -> AppResult<Vec<Equipment>> {
        let days = days.unwrap_or(self.lookahead_days()).max(0);
        let today = Self::today();
        let rows = self
            .repository
            .equipment
            .maintenance_candidates(today + Duration::days(days))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_equipment(today, days))
            .filter(|item| item.maintenance_status != MaintenanceStatus::UpToDate)
            .collect())
    }
}
