//! Reporting and dashboard aggregates

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    api::reports::{CategoryEntry, DashboardResponse, EquipmentReport, StatEntry, UnitTotals},
    config::EquipmentConfig,
    error::AppResult,
    models::{
        enums::{CheckoutStatus, EquipmentStatus, MaintenanceRecordStatus, MaintenanceStatus},
        maintenance::derive_maintenance_status,
        user::UserClaims,
    },
    repository::{maintenance::WORK_STATUS_SQL, Repository},
};

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    config: EquipmentConfig,
}

impl ReportsService {
    pub fn new(repository: Repository, config: EquipmentConfig) -> Self {
        Self { repository, config }
    }

    /// Counts per label in the given order, zeros included
    fn entries<T: std::fmt::Display + Eq + std::hash::Hash>(order: &[T], counts: &HashMap<T, i64>) -> Vec<StatEntry> {
        order
            .iter()
            .map(|key| StatEntry {
                label: key.to_string(),
                value: counts.get(key).copied().unwrap_or(0),
            })
            .collect()
    }

    async fn maintenance_counts(&self, today: NaiveDate) -> AppResult<HashMap<MaintenanceStatus, i64>> {
        let rows: Vec<(Option<MaintenanceRecordStatus>, Option<NaiveDate>)> = sqlx::query_as(&format!(
            "SELECT {}, e.next_maintenance_date FROM equipment e",
            WORK_STATUS_SQL
        ))
        .fetch_all(&self.repository.pool)
        .await?;

        let mut counts = HashMap::new();
        for (latest, next) in rows {
            let status = derive_maintenance_status(latest, next, today, self.config.maintenance_lookahead_days);
            *counts.entry(status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Catalog, checkout and maintenance totals
    pub async fn equipment_report(&self, year: Option<i32>) -> AppResult<EquipmentReport> {
        let now = Utc::now();
        let today = now.date_naive();
        let year = year.unwrap_or_else(|| today.year());
        let pool = &self.repository.pool;

        let (items, owned, out, available): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(available_quantity), 0)::bigint,
                   COALESCE(SUM(current_quantity_out), 0)::bigint,
                   COALESCE(SUM(GREATEST(available_quantity - current_quantity_out, 0)), 0)::bigint
            FROM equipment
            "#,
        )
        .fetch_one(pool)
        .await?;

        let by_status: HashMap<_, _> = sqlx::query_as::<_, (EquipmentStatus, i64)>(
            "SELECT checkout_status, COUNT(*) FROM equipment GROUP BY checkout_status",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

        // `overdue` is split from `checked_out` the same way the checkout listings do
        let by_checkout: HashMap<_, _> = sqlx::query_as::<_, (CheckoutStatus, i64)>(
            r#"
            SELECT CASE WHEN status = 'checked_out' AND expected_return_date < $1
                        THEN 'overdue' ELSE status END,
                   COUNT(*)
            FROM checkout_records
            GROUP BY 1
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

        let maintenance_cost: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(cost), 0) FROM maintenance_records
            WHERE performed_date >= make_date($1, 1, 1) AND performed_date < make_date($1 + 1, 1, 1)
            "#,
        )
        .bind(year)
        .fetch_one(pool)
        .await?;

        let top_categories = sqlx::query_as::<_, (String, i64, i64)>(
            r#"
            SELECT category, COUNT(*), COALESCE(SUM(available_quantity), 0)::bigint AS units
            FROM equipment
            GROUP BY category
            ORDER BY units DESC, category
            LIMIT 10
            "#,
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(category, items, units)| CategoryEntry { category, items, units })
        .collect();

        let maintenance = self.maintenance_counts(today).await?;

        Ok(EquipmentReport {
            units: UnitTotals {
                items,
                owned,
                out,
                available,
            },
            by_checkout_status: Self::entries(EquipmentStatus::ALL, &by_status),
            by_maintenance_status: Self::entries(MaintenanceStatus::ALL, &maintenance),
            checkouts_by_status: Self::entries(CheckoutStatus::ALL, &by_checkout),
            overdue_checkouts: by_checkout.get(&CheckoutStatus::Overdue).copied().unwrap_or(0),
            maintenance_year: year,
            maintenance_cost,
            top_categories,
        })
    }

    /// Cards shown to the current user
    pub async fn dashboard(&self, claims: &UserClaims) -> AppResult<DashboardResponse> {
        let now = Utc::now();
        let pool = &self.repository.pool;

        let unread_notifications = self.repository.notifications.unread_count(claims.user_id).await?;

        let (active_checkouts, overdue_checkouts): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status IN ('pending_approval', 'approved', 'checked_out')),
                   COUNT(*) FILTER (WHERE status = 'checked_out' AND expected_return_date < $2)
            FROM checkout_records
            WHERE requester_id = $1
            "#,
        )
        .bind(claims.user_id)
        .bind(now)
        .fetch_one(pool)
        .await?;

        let pending_approvals = if claims.role.can_approve_checkouts() {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM checkout_records WHERE status = 'pending_approval'",
            )
            .fetch_one(pool)
            .await?;
            Some(count)
        } else {
            None
        };

        let maintenance_attention = if claims.role.is_staff() {
            let counts = self.maintenance_counts(now.date_naive()).await?;
            Some(
                counts
                    .iter()
                    .filter(|(status, _)| **status != MaintenanceStatus::UpToDate)
                    .map(|(_, count)| count)
                    .sum::<i64>(),
            )
        } else {
            None
        };

        Ok(DashboardResponse {
            unread_notifications,
            active_checkouts,
            overdue_checkouts,
            pending_approvals,
            maintenance_attention,
        })
    }
}
