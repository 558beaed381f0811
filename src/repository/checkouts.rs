//! Checkout records repository
//!
//! Every state change runs in one transaction: the record row is locked
//! first, then the equipment rows it touches (in id order), and the activity
//! entry is written before commit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        activity::{actions, entities, NewActivity},
        checkout::{
            effective_status, resolve_return, CheckoutLine, CheckoutQuery, CheckoutRecord,
            CheckoutRecordRow, CreateCheckout, ReturnCheckout,
        },
        enums::CheckoutStatus,
        equipment::StockRow,
    },
};

use super::{activities::ActivitiesRepository, equipment::EquipmentRepository};

const RECORD_SELECT: &str = r#"
    SELECT cr.*,
           COALESCE(NULLIF(TRIM(CONCAT_WS(' ', ru.firstname, ru.lastname)), ''), ru.login) AS requester_name,
           COALESCE(NULLIF(TRIM(CONCAT_WS(' ', au.firstname, au.lastname)), ''), au.login) AS approver_name
    FROM checkout_records cr
    JOIN users ru ON ru.id = cr.requester_id
    LEFT JOIN users au ON au.id = cr.approver_id
"#;

/// Filter on effective status: `overdue` and `checked_out` are split by date
const RECORD_FILTER: &str = r#"
    ($1::text IS NULL
        OR ($1 = 'overdue' AND cr.status = 'checked_out' AND cr.expected_return_date < $4)
        OR ($1 = 'checked_out' AND cr.status = 'checked_out' AND cr.expected_return_date >= $4)
        OR ($1 NOT IN ('overdue', 'checked_out') AND cr.status = $1))
    AND ($2::int IS NULL OR cr.requester_id = $2)
    AND ($3::int IS NULL OR EXISTS (
        SELECT 1 FROM checkout_items ci WHERE ci.checkout_id = cr.id AND ci.equipment_id = $3))
"#;

/// Lock state of a record taken at the start of a transition
#[derive(Debug, sqlx::FromRow)]
struct LockedRecord {
    status: CheckoutStatus,
    requester_id: i32,
    expected_return_date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CheckoutsRepository {
    pool: Pool<Postgres>,
}

impl CheckoutsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_lines<'e, E: PgExecutor<'e>>(executor: E, ids: &[i32]) -> AppResult<Vec<CheckoutLine>> {
        let lines = sqlx::query_as::<_, CheckoutLine>(
            r#"
            SELECT ci.id, ci.checkout_id, ci.equipment_id, e.name AS equipment_name,
                   ci.quantity, ci.return_condition, ci.return_notes
            FROM checkout_items ci
            JOIN equipment e ON e.id = ci.equipment_id
            WHERE ci.checkout_id = ANY($1)
            ORDER BY ci.checkout_id, ci.equipment_id
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Attach line items to rows and compute effective statuses
    async fn assemble(&self, rows: Vec<CheckoutRecordRow>, now: DateTime<Utc>) -> AppResult<Vec<CheckoutRecord>> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut by_record: HashMap<i32, Vec<CheckoutLine>> = HashMap::new();
        for line in Self::fetch_lines(&self.pool, &ids).await? {
            by_record.entry(line.checkout_id).or_default().push(line);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_record.remove(&row.id).unwrap_or_default();
                row.into_record(items, now)
            })
            .collect())
    }

    /// Get a checkout record with its lines
    pub async fn get_by_id(&self, id: i32, now: DateTime<Utc>) -> AppResult<CheckoutRecord> {
        let row = sqlx::query_as::<_, CheckoutRecordRow>(&format!("{} WHERE cr.id = $1", RECORD_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checkout {} not found", id)))?;

        let mut records = self.assemble(vec![row], now).await?;
        records
            .pop()
            .ok_or_else(|| AppError::Internal(format!("Checkout {} vanished while loading", id)))
    }

    /// Search checkout records, newest first
    pub async fn search(
        &self,
        query: &CheckoutQuery,
        now: DateTime<Utc>,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<CheckoutRecord>, i64)> {
        let status = query.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM checkout_records cr WHERE {}",
            RECORD_FILTER
        ))
        .bind(status)
        .bind(query.requester_id)
        .bind(query.equipment_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CheckoutRecordRow>(&format!(
            "{} WHERE {} ORDER BY cr.created_at DESC, cr.id DESC LIMIT $5 OFFSET $6",
            RECORD_SELECT, RECORD_FILTER
        ))
        .bind(status)
        .bind(query.requester_id)
        .bind(query.equipment_id)
        .bind(now)
        .bind(per_page)
        .bind(super::offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;

        Ok((self.assemble(rows, now).await?, total))
    }

    async fn lock_record(conn: &mut PgConnection, id: i32) -> AppResult<LockedRecord> {
        sqlx::query_as::<_, LockedRecord>(
            "SELECT status, requester_id, expected_return_date FROM checkout_records WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Checkout {} not found", id)))
    }

    /// Pair each line with its stock row; every line's item must exist
    fn match_stock<'a>(lines: &[(i32, i32)], stock: &'a [StockRow]) -> AppResult<Vec<&'a StockRow>> {
        lines
            .iter()
            .map(|(equipment_id, _)| {
                stock
                    .iter()
                    .find(|s| s.id == *equipment_id)
                    .ok_or_else(|| AppError::Validation(format!("Equipment {} not found", equipment_id)))
            })
            .collect()
    }

    /// Create a request in `pending_approval`. Availability is checked but not reserved.
    pub async fn create(&self, requester_id: i32, data: &CreateCheckout) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let mut pairs: Vec<(i32, i32)> = data.items.iter().map(|l| (l.equipment_id, l.quantity)).collect();
        pairs.sort_unstable();
        let ids: Vec<i32> = pairs.iter().map(|(id, _)| *id).collect();

        let stock = EquipmentRepository::read_stock(&mut tx, &ids).await?;
        for (row, (_, quantity)) in Self::match_stock(&pairs, &stock)?.into_iter().zip(&pairs) {
            row.stock().ensure_available(&row.name, *quantity)?;
        }

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO checkout_records (requester_id, purpose, location, notes, expected_return_date, status)
            VALUES ($1, $2, $3, $4, $5, 'pending_approval')
            RETURNING id
            "#,
        )
        .bind(requester_id)
        .bind(data.purpose.trim())
        .bind(&data.location)
        .bind(&data.notes)
        .bind(data.expected_return_date)
        .fetch_one(&mut *tx)
        .await?;

        for (equipment_id, quantity) in &pairs {
            sqlx::query("INSERT INTO checkout_items (checkout_id, equipment_id, quantity) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(equipment_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        }

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                requester_id,
                actions::CHECKOUT_REQUESTED,
                entities::CHECKOUT,
                id,
                format!("Requested checkout #{} for {}", id, data.purpose.trim()),
            )
            .details(serde_json::json!({ "items": data.items.iter().map(|l| {
                serde_json::json!({ "equipment_id": l.equipment_id, "quantity": l.quantity })
            }).collect::<Vec<_>>() })),
        )
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Approve (reserving units) or reject a pending request
    pub async fn approve(&self, id: i32, approver_id: i32, approved: bool, notes: Option<&str>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let record = Self::lock_record(&mut tx, id).await?;

        if !approved {
            record.status.ensure_transition(CheckoutStatus::Cancelled)?;
            sqlx::query(
                r#"
                UPDATE checkout_records
                SET status = 'cancelled', approver_id = $2, approval_notes = $3,
                    cancelled_at = NOW(), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(approver_id)
            .bind(notes)
            .execute(&mut *tx)
            .await?;

            ActivitiesRepository::record(
                &mut tx,
                &NewActivity::new(
                    approver_id,
                    actions::CHECKOUT_REJECTED,
                    entities::CHECKOUT,
                    id,
                    format!("Rejected checkout #{}", id),
                )
                .details(serde_json::json!({ "notes": notes })),
            )
            .await?;

            tx.commit().await?;
            return Ok(());
        }

        record.status.ensure_transition(CheckoutStatus::Approved)?;

        let lines = Self::fetch_lines(&mut *tx, &[id]).await?;
        let pairs: Vec<(i32, i32)> = lines.iter().map(|l| (l.equipment_id, l.quantity)).collect();
        let ids: Vec<i32> = pairs.iter().map(|(id, _)| *id).collect();
        let stock = EquipmentRepository::lock_stock(&mut tx, &ids).await?;

        // compute every allocation before writing any of them
        let mut allocations = Vec::with_capacity(pairs.len());
        for (row, (_, quantity)) in Self::match_stock(&pairs, &stock)?.into_iter().zip(&pairs) {
            allocations.push((row.id, row.stock().allocate(&row.name, *quantity)?));
        }
        for (equipment_id, stock) in &allocations {
            EquipmentRepository::save_stock(&mut tx, *equipment_id, stock).await?;
        }

        sqlx::query(
            r#"
            UPDATE checkout_records
            SET status = 'approved', approver_id = $2, approval_notes = $3,
                approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(approver_id)
        .bind(notes)
        .execute(&mut *tx)
        .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                approver_id,
                actions::CHECKOUT_APPROVED,
                entities::CHECKOUT,
                id,
                format!("Approved checkout #{}", id),
            )
            .details(serde_json::json!({ "notes": notes, "units": pairs.iter().map(|(_, q)| q).sum::<i32>() })),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Cancel a pending request
    pub async fn cancel(&self, id: i32, actor_id: i32, reason: Option<&str>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let record = Self::lock_record(&mut tx, id).await?;
        record.status.ensure_transition(CheckoutStatus::Cancelled)?;

        sqlx::query(
            r#"
            UPDATE checkout_records
            SET status = 'cancelled', cancelled_at = NOW(), updated_at = NOW(),
                notes = CASE WHEN $2::text IS NULL THEN notes
                             ELSE CONCAT_WS(E'\n', notes, 'Cancelled: ' || $2) END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::CHECKOUT_CANCELLED,
                entities::CHECKOUT,
                id,
                format!("Cancelled checkout #{}", id),
            )
            .details(serde_json::json!({ "reason": reason, "requester_id": record.requester_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Hand approved equipment over to the requester
    pub async fn hand_off(&self, id: i32, actor_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let record = Self::lock_record(&mut tx, id).await?;
        record.status.ensure_transition(CheckoutStatus::CheckedOut)?;

        sqlx::query(
            r#"
            UPDATE checkout_records
            SET status = 'checked_out', checked_out_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::CHECKOUT_HANDED_OFF,
                entities::CHECKOUT,
                id,
                format!("Handed off checkout #{}", id),
            ),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Receive every line of a checked-out (or overdue) record and release its units
    pub async fn return_all(
        &self,
        id: i32,
        actor_id: i32,
        data: &ReturnCheckout,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let record = Self::lock_record(&mut tx, id).await?;
        let status = effective_status(record.status, record.expected_return_date, now);
        status.ensure_transition(CheckoutStatus::Returned)?;

        let lines = Self::fetch_lines(&mut *tx, &[id]).await?;
        let resolved = resolve_return(&lines, &data.items)?;
        let ids: Vec<i32> = resolved.iter().map(|r| r.equipment_id).collect();
        let stock = EquipmentRepository::lock_stock(&mut tx, &ids).await?;

        for line in &resolved {
            let row = stock
                .iter()
                .find(|s| s.id == line.equipment_id)
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", line.equipment_id)))?;
            let released = row.stock().release(line.quantity, line.condition);
            EquipmentRepository::save_stock(&mut tx, row.id, &released).await?;

            sqlx::query("UPDATE checkout_items SET return_condition = $2, return_notes = $3 WHERE id = $1")
                .bind(line.line_id)
                .bind(line.condition)
                .bind(&line.notes)
                .execute(&mut *tx)
                .await?;

            tracing::debug!(
                checkout_id = id,
                equipment_id = row.id,
                quantity = line.quantity,
                condition = %line.condition,
                status = %released.status,
                "Released equipment units"
            );
        }

        sqlx::query(
            r#"
            UPDATE checkout_records
            SET status = 'returned', returned_at = $2, return_notes = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(&data.notes)
        .execute(&mut *tx)
        .await?;

        ActivitiesRepository::record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                actions::CHECKOUT_RETURNED,
                entities::CHECKOUT,
                id,
                format!("Received return of checkout #{}", id),
            )
            .details(serde_json::json!({
                "was_overdue": status == CheckoutStatus::Overdue,
                "items": resolved.iter().map(|r| serde_json::json!({
                    "equipment_id": r.equipment_id,
                    "quantity": r.quantity,
                    "condition": r.condition,
                })).collect::<Vec<_>>(),
            })),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
