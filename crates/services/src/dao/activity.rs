use async_trait::async_trait;
use bson::doc;
use leadflow_db::models::Activity;
use mongodb::Database;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};
use crate::query::ActivityQuery;
use crate::repo::ActivityRepo;

/// Append-only: exposes no update or delete.
pub struct ActivityDao {
    pub base: BaseDao<Activity>,
}

impl ActivityDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Activity::COLLECTION),
        }
    }
}

#[async_trait]
impl ActivityRepo for ActivityDao {
    async fn insert(&self, mut activity: Activity) -> DaoResult<Activity> {
        let id = self.base.insert_one(&activity).await?;
        activity.id = Some(id);
        Ok(activity)
    }

    async fn find_page(
        &self,
        query: &ActivityQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Activity>> {
        self.base
            .find_paginated(query.to_document(), Some(doc! { "created_at": -1, "_id": -1 }), params)
            .await
    }

    async fn find_all(&self, query: &ActivityQuery) -> DaoResult<Vec<Activity>> {
        self.base
            .find_many(query.to_document(), Some(doc! { "created_at": 1, "_id": 1 }))
            .await
    }
}
