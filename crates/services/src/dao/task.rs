use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use leadflow_db::models::{CallStatus, Task};
use mongodb::{options::ReturnDocument, Database};

use super::base::{map_write_error, BaseDao, DaoResult, PaginatedResult, PaginationParams};
use crate::query::TaskQuery;
use crate::repo::TaskRepo;

pub struct TaskDao {
    pub base: BaseDao<Task>,
}

impl TaskDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Task::COLLECTION),
        }
    }
}

#[async_trait]
impl TaskRepo for TaskDao {
    /// The partial unique index `lead_open_task_unique` rejects a second open
    /// task with E11000, surfaced as `DuplicateKey`.
    async fn insert(&self, mut task: Task) -> DaoResult<Task> {
        let id = self.base.insert_one(&task).await?;
        task.id = Some(id);
        Ok(task)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Task>> {
        self.base.find_by_id(id).await
    }

    async fn find_open_for_lead(&self, lead: ObjectId) -> DaoResult<Option<Task>> {
        self.base
            .find_one(doc! { "lead": lead, "is_completed": false })
            .await
    }

    async fn complete(
        &self,
        id: ObjectId,
        by: Option<ObjectId>,
        call_status: Option<CallStatus>,
    ) -> DaoResult<Option<Task>> {
        let now = DateTime::now();
        let mut set = doc! {
            "is_completed": true,
            "completed_at": now,
            "completed_by": by,
            "updated_at": now,
        };
        if call_status.is_some() {
            set.insert("call_status", bson::to_bson(&call_status)?);
        }
        let updated = self
            .base
            .collection()
            .find_one_and_update(doc! { "_id": id, "is_completed": false }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_write_error)?;
        Ok(updated)
    }

    async fn complete_all_for_lead(&self, lead: ObjectId) -> DaoResult<u64> {
        self.base
            .update_many(
                doc! { "lead": lead, "is_completed": false },
                doc! { "$set": { "is_completed": true, "completed_at": DateTime::now() } },
            )
            .await
    }

    async fn set_follow_up(&self, id: ObjectId, follow_up: ObjectId) -> DaoResult<()> {
        self.base
            .update_by_id(id, doc! { "$set": { "follow_up": follow_up } })
            .await?;
        Ok(())
    }

    async fn find_page(
        &self,
        query: &TaskQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Task>> {
        self.base
            .find_paginated(query.to_document(), Some(doc! { "due": 1 }), params)
            .await
    }

    async fn find_all(&self, query: &TaskQuery) -> DaoResult<Vec<Task>> {
        self.base
            .find_many(query.to_document(), Some(doc! { "due": 1 }))
            .await
    }
}
