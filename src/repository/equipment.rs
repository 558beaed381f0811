//! Equipment repository for database operations

use chrono::NaiveDate;
use sqlx::{types::Json, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        activity::{actions, entities, NewActivity},
        equipment::{
            normalize_tags, CreateEquipment, EquipmentQuery, EquipmentRow, Stock, StockRow,
            UpdateEquipment,
        },
    },
};

use super::{activities::ActivitiesRepository, maintenance::WORK_STATUS_SQL};

/// Equipment columns plus the status of the latest non-scheduled maintenance record
fn equipment_select() -> String {
    format!("SELECT e.*, {} AS work_status FROM equipment e", WORK_STATUS_SQL)
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search equipment with filters and pagination
    pub async fn search(
        &self,
        query: &EquipmentQuery,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<EquipmentRow>, i64)> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref search) = query.search {
            params.push(format!("%{}%", search.trim()));
            conditions.push(format!("e.name ILIKE ${}", params.len()));
        }
        if let Some(ref category) = query.category {
            params.push(category.clone());
            conditions.push(format!("e.category = ${}", params.len()));
        }
        if let Some(ref tag) = query.tag {
            params.push(tag.clone());
            conditions.push(format!("${} = ANY(e.tags)", params.len()));
        }
        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("e.checkout_status = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM equipment e {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY e.name, e.id LIMIT {} OFFSET {}",
            equipment_select(),
            where_clause,
            per_page,
            super::offset(page, per_page)
        );
        let mut builder = sqlx::query_as::<_, EquipmentRow>(&select_query);
        for param in &params {
            builder = builder.bind(param);
        }
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Distinct categories, sorted
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let categories = sqlx::query_scalar("SELECT DISTINCT category FROM equipment ORDER BY category")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<EquipmentRow> {
        sqlx::query_as::<_, EquipmentRow>(&format!("{} WHERE e.id = $1", equipment_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Items whose next maintenance falls before `until` or whose maintenance work is still in progress
    pub async fn maintenance_candidates(&self, until: NaiveDate) -> AppResult<Vec<EquipmentRow>> {
        let rows = sqlx::query_as::<_, EquipmentRow>(&format!(
            r#"
            SELECT * FROM ({}) sub
            WHERE sub.work_status = 'in_progress'
               OR sub.next_maintenance_date <= $1
            ORDER BY sub.next_maintenance_date NULLS FIRST, sub.id
            "#,
            equipment_select()
        ))
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Create equipment. New items own `available_quantity` units, none out.
    pub async fn create(&self, actor_id: i32, data: &CreateEquipment) -> AppResult<EquipmentRow> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO equipment (name, category, description, serial_number, tags,
                                   pricing_tiers, available_quantity, current_quantity_out, checkout_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 'available')
            RETURNING id
            "#,
        )
        .bind(data.name.trim())
        .bind(data.category.trim())
        .bind(&data.description)
        .bind(&data.serial_number)
        .bind(normalize_tags(&data.tags))
        .bind(Json(&data.pricing_tiers))
        .bind(data.available_quantity.unwrap_or(1))
        .fetch_one(&mut *tx)
        .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::EQUIPMENT_CREATED,
                entities::EQUIPMENT,
                id,
                format!("Added {} to the catalog", data.name.trim()),
            ),
        )
        .await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Update equipment. Quantity and status changes go through `Stock` under a row lock.
    pub async fn update(&self, actor_id: i32, id: i32, data: &UpdateEquipment) -> AppResult<EquipmentRow> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_stock(&mut tx, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        let mut stock = current.stock();
        if let Some(total) = data.available_quantity {
            stock = stock.resize(total)?;
        }
        if let Some(status) = data.checkout_status {
            stock = stock.with_status(status)?;
        }

        let tags = data.tags.as_deref().map(normalize_tags);
        let pricing_tiers = data.pricing_tiers.as_ref().map(Json);

        sqlx::query(
            r#"
            UPDATE equipment SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                description = CASE WHEN $4::text IS NULL THEN description ELSE NULLIF(TRIM($4), '') END,
                serial_number = CASE WHEN $5::text IS NULL THEN serial_number ELSE NULLIF(TRIM($5), '') END,
                tags = COALESCE($6, tags),
                pricing_tiers = COALESCE($7, pricing_tiers),
                available_quantity = $8,
                checkout_status = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.category.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(&data.serial_number)
        .bind(tags)
        .bind(pricing_tiers)
        .bind(stock.total)
        .bind(stock.status)
        .execute(&mut *tx)
        .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::EQUIPMENT_UPDATED,
                entities::EQUIPMENT,
                id,
                format!("Updated {}", current.name),
            )
            .details(serde_json::json!({
                "available_quantity": stock.total,
                "checkout_status": stock.status,
            })),
        )
        .await?;

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Delete equipment. Refused while units are out or any checkout references it.
    pub async fn delete(&self, actor_id: i32, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let current = Self::lock_stock(&mut tx, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        if current.current_quantity_out > 0 {
            return Err(AppError::BusinessRule(format!(
                "{} has {} unit(s) out and cannot be deleted",
                current.name, current.current_quantity_out
            )));
        }

        let (active, any): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM checkout_items ci
                       JOIN checkout_records cr ON cr.id = ci.checkout_id
                       WHERE ci.equipment_id = $1
                         AND cr.status IN ('pending_approval', 'approved', 'checked_out')),
                EXISTS(SELECT 1 FROM checkout_items WHERE equipment_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if active {
            return Err(AppError::BusinessRule(format!(
                "{} is part of an open checkout request",
                current.name
            )));
        }
        if any {
            return Err(AppError::BusinessRule(format!(
                "{} has checkout history; retire it instead of deleting it",
                current.name
            )));
        }

        sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::EQUIPMENT_DELETED,
                entities::EQUIPMENT,
                id,
                format!("Removed {} from the catalog", current.name),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Unlocked stock snapshot of the given items, ordered by id
    pub async fn read_stock(conn: &mut PgConnection, ids: &[i32]) -> AppResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, name, available_quantity, current_quantity_out, checkout_status
            FROM equipment WHERE id = ANY($1) ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    /// Lock the stock rows of the given items. Rows are always locked in id
    /// order so concurrent approvals and returns cannot deadlock.
    pub async fn lock_stock(conn: &mut PgConnection, ids: &[i32]) -> AppResult<Vec<StockRow>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, name, available_quantity, current_quantity_out, checkout_status
            FROM equipment WHERE id = ANY($1) ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    /// Persist unit counts and status computed by `Stock`
    pub async fn save_stock(conn: &mut PgConnection, id: i32, stock: &Stock) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE equipment
            SET current_quantity_out = $2, checkout_status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(stock.out)
        .bind(stock.status)
        .execute(conn)
        .await?;
        Ok(())
    }
}
