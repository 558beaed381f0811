//! Activity feed service

use crate::{
    error::AppResult,
    models::activity::{Activity, ActivityQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct ActivitiesService {
    repository: Repository,
}

impl ActivitiesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search(&self, query: &ActivityQuery, page: i64, per_page: i64) -> AppResult<(Vec<Activity>, i64)> {
        self.repository.activities.search(query, page, per_page).await
    }
}
