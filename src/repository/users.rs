//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{CreateUser, UpdateUser, User, UserQuery},
    },
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by login (case-insensitive)
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(login) = LOWER($1)")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Check if login already exists
    pub async fn login_exists(&self, login: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(login) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(login)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery, page: i64, per_page: i64) -> AppResult<(Vec<User>, i64)> {
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref name) = query.name {
            params.push(format!("%{}%", name.to_lowercase()));
            conditions.push(format!(
                "(LOWER(login) LIKE ${0} OR LOWER(firstname) LIKE ${0} OR LOWER(lastname) LIKE ${0})",
                params.len()
            ));
        }

        if let Some(role) = query.role {
            params.push(role.as_str().to_string());
            conditions.push(format!("role = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM users {} ORDER BY lastname NULLS LAST, firstname NULLS LAST, login LIMIT {} OFFSET {}",
            where_clause,
            per_page,
            super::offset(page, per_page)
        );
        let mut builder = sqlx::query_as::<_, User>(&select_query);
        for param in &params {
            builder = builder.bind(param);
        }
        let users = builder.fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user; `password_hash` is already hashed
    pub async fn create(&self, user: &CreateUser, password_hash: &str) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password, firstname, lastname, email, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.login.trim())
        .bind(password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(user.role.unwrap_or(Role::Client))
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update a user; only provided fields are changed
    pub async fn update(&self, id: i32, data: &UpdateUser, password_hash: Option<String>) -> AppResult<User> {
        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.login, "login");
        add_field!(password_hash, "password");
        add_field!(data.firstname, "firstname");
        add_field!(data.lastname, "lastname");
        add_field!(data.email, "email");
        add_field!(data.role, "role");
        add_field!(data.is_active, "is_active");

        let query = format!(
            "UPDATE users SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            idx
        );
        let mut builder = sqlx::query_as::<_, User>(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.login);
        bind_field!(password_hash);
        bind_field!(data.firstname);
        bind_field!(data.lastname);
        bind_field!(data.email);
        bind_field!(data.role);
        bind_field!(data.is_active);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Active users holding one of the given roles
    pub async fn active_ids_with_roles(&self, roles: &[Role]) -> AppResult<Vec<i32>> {
        let roles: Vec<&str> = roles.iter().map(Role::as_str).collect();
        let ids = sqlx::query_scalar(
            "SELECT id FROM users WHERE is_active AND role = ANY($1) ORDER BY id",
        )
        .bind(&roles)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn count_with_role(&self, role: Role) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
