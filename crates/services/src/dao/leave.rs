use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use leadflow_db::models::{Leave, LeaveStatus};
use mongodb::{options::ReturnDocument, Database};

use super::base::{map_write_error, BaseDao, DaoResult, PaginatedResult, PaginationParams};
use crate::query::LeaveQuery;
use crate::repo::LeaveRepo;

pub struct LeaveDao {
    pub base: BaseDao<Leave>,
}

impl LeaveDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Leave::COLLECTION),
        }
    }
}

#[async_trait]
impl LeaveRepo for LeaveDao {
    async fn insert(&self, mut leave: Leave) -> DaoResult<Leave> {
        let id = self.base.insert_one(&leave).await?;
        leave.id = Some(id);
        Ok(leave)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Leave>> {
        self.base.find_by_id(id).await
    }

    async fn set_status(
        &self,
        id: ObjectId,
        status: LeaveStatus,
        reviewer: ObjectId,
    ) -> DaoResult<Option<Leave>> {
        let updated = self
            .base
            .collection()
            .find_one_and_update(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "status": status,
                        "reviewed_by": reviewer,
                        "updated_at": DateTime::now(),
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_write_error)?;
        Ok(updated)
    }

    async fn find_page(
        &self,
        query: &LeaveQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Leave>> {
        self.base
            .find_paginated(query.to_document(), Some(doc! { "date": -1 }), params)
            .await
    }
}
