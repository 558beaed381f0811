//! Activity history repository

use sqlx::{types::Json, PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::activity::{Activity, ActivityQuery, NewActivity},
};

#[derive(Clone)]
pub struct ActivitiesRepository {
    pool: Pool<Postgres>,
}

impl ActivitiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append an activity on the caller's connection, usually inside the
    /// transaction that performs the change being recorded
    pub async fn record(conn: &mut PgConnection, activity: &NewActivity) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (actor_id, action, entity_type, entity_id, description, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(activity.actor_id)
        .bind(activity.action)
        .bind(activity.entity_type)
        .bind(activity.entity_id)
        .bind(&activity.description)
        .bind(Json(&activity.details))
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Activity feed, newest first
    pub async fn search(
        &self,
        query: &ActivityQuery,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<Activity>, i64)> {
        const FILTER: &str = r#"
            ($1::text IS NULL OR a.entity_type = $1)
            AND ($2::int IS NULL OR a.entity_id = $2)
            AND ($3::int IS NULL OR a.actor_id = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM activities a WHERE {}",
            FILTER
        ))
        .bind(&query.entity_type)
        .bind(query.entity_id)
        .bind(query.actor_id)
        .fetch_one(&self.pool)
        .await?;

        let activities = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT a.id, a.actor_id,
                   COALESCE(NULLIF(TRIM(CONCAT_WS(' ', u.firstname, u.lastname)), ''), u.login) AS actor_name,
                   a.action, a.entity_type, a.entity_id, a.description, a.details, a.created_at
            FROM activities a
            LEFT JOIN users u ON u.id = a.actor_id
            WHERE {}
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $4 OFFSET $5
            "#,
            FILTER
        ))
        .bind(&query.entity_type)
        .bind(query.entity_id)
        .bind(query.actor_id)
        .bind(per_page)
        .bind(super::offset(page, per_page))
        .fetch_all(&self.pool)
        .await?;

        Ok((activities, total))
    }
}
