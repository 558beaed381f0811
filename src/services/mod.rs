//! Business logic services

pub mod activities;
pub mod checkouts;
pub mod equipment;
pub mod maintenance;
pub mod notifications;
pub mod redis;
pub mod reports;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub equipment: equipment::EquipmentService,
    pub checkouts: checkouts::CheckoutsService,
    pub maintenance: maintenance::MaintenanceService,
    pub notifications: notifications::NotificationsService,
    pub activities: activities::ActivitiesService,
    pub reports: reports::ReportsService,
}

impl Services {
    /// Create all services with the given repository. The hub is shared with
    /// the Redis relay task when one is running.
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        hub: notifications::NotificationHub,
        relay: Option<redis::RedisRelay>,
    ) -> Self {
        let notifications = notifications::NotificationsService::new(repository.clone(), hub, relay);

        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            equipment: equipment::EquipmentService::new(repository.clone(), config.equipment.clone()),
            checkouts: checkouts::CheckoutsService::new(repository.clone(), notifications.clone()),
            maintenance: maintenance::MaintenanceService::new(repository.clone(), notifications.clone()),
            activities: activities::ActivitiesService::new(repository.clone()),
            reports: reports::ReportsService::new(repository, config.equipment.clone()),
            notifications,
        }
    }
}
