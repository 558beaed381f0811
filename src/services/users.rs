//! Authentication and user management service

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::rngs::OsRng;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{CreateUser, UpdateUser, User, UserClaims, UserQuery},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by login and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !Self::verify_password(&user, password)? {
            tracing::info!(login, "Rejected login with a wrong password");
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok((token, user))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.login.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn verify_password(user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn search_users(&self, query: &UserQuery, page: i64, per_page: i64) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query, page, per_page).await
    }

    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.login_exists(user.login.trim(), None).await? {
            return Err(AppError::Conflict(format!("Login {} is already taken", user.login.trim())));
        }

        let hash = Self::hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &hash).await?;
        tracing::info!(user_id = created.id, role = %created.role, "User created");
        Ok(created)
    }

    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        user.validate()?;

        if let Some(ref login) = user.login {
            if self.repository.users.login_exists(login.trim(), Some(id)).await? {
                return Err(AppError::Conflict(format!("Login {} is already taken", login.trim())));
            }
        }

        let hash = match user.password {
            Some(ref password) => Some(Self::hash_password(password)?),
            None => None,
        };

        let updated = self.repository.users.update(id, &user, hash).await?;
        tracing::info!(user_id = id, "User updated");
        Ok(updated)
    }

    /// Create the configured super admin when no super admin exists yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let (Some(login), Some(password)) = (
            self.config.bootstrap_admin_login.clone(),
            self.config.bootstrap_admin_password.clone(),
        ) else {
            return Ok(());
        };

        if self.repository.users.count_with_role(Role::SuperAdmin).await? > 0 {
            return Ok(());
        }

        let admin = self
            .create_user(CreateUser {
                login,
                password,
                firstname: None,
                lastname: None,
                email: None,
                role: Some(Role::SuperAdmin),
            })
            .await?;
        tracing::warn!(user_id = admin.id, login = %admin.login, "Created bootstrap super admin");
        Ok(())
    }
}
