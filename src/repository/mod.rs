//! Repository layer for database operations

pub mod activities;
pub mod checkouts;
pub mod equipment;
pub mod maintenance;
pub mod notifications;
pub mod users;

use sqlx::{Pool, Postgres};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page whose offset still fits in an i64
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Normalize pagination parameters: 1 <= page <= MAX_PAGE, 1 <= per_page <= 100
pub fn paginate(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Row offset of a page
pub fn offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(per_page)
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub equipment: equipment::EquipmentRepository,
    pub checkouts: checkouts::CheckoutsRepository,
    pub maintenance: maintenance::MaintenanceRepository,
    pub notifications: notifications::NotificationsRepository,
    pub activities: activities::ActivitiesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            checkouts: checkouts::CheckoutsRepository::new(pool.clone()),
            maintenance: maintenance::MaintenanceRepository::new(pool.clone()),
            notifications: notifications::NotificationsRepository::new(pool.clone()),
            activities: activities::ActivitiesRepository::new(pool.clone()),
            pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        assert_eq!(paginate(None, None), (1, 20));
        assert_eq!(paginate(Some(0), Some(0)), (1, 1));
        assert_eq!(paginate(Some(3), Some(500)), (3, 100));
        assert_eq!(paginate(Some(-2), Some(50)), (1, 50));
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let (page, per_page) = paginate(Some(i64::MAX), Some(100));
        assert_eq!(page, MAX_PAGE);
        assert!(offset(page, per_page) > 0);
        assert_eq!(offset(1, 20), 0);
        assert_eq!(offset(3, 20), 40);
        assert_eq!(offset(i64::MAX, i64::MAX), i64::MAX);
    }
}
