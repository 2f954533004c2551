use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use leadflow_db::models::Notification;
use mongodb::Database;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};
use crate::repo::NotificationRepo;

pub struct NotificationDao {
    pub base: BaseDao<Notification>,
}

impl NotificationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Notification::COLLECTION),
        }
    }
}

#[async_trait]
impl NotificationRepo for NotificationDao {
    async fn insert(&self, mut notification: Notification) -> DaoResult<Notification> {
        let id = self.base.insert_one(&notification).await?;
        notification.id = Some(id);
        Ok(notification)
    }

    async fn find_page(
        &self,
        assigned: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>> {
        self.base
            .find_paginated(doc! { "assigned": assigned }, None, params)
            .await
    }
}
