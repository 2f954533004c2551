use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use leadflow_db::models::Lead;
use mongodb::Database;

use super::base::{map_write_error, BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::query::LeadQuery;
use crate::repo::LeadRepo;

pub struct LeadDao {
    pub base: BaseDao<Lead>,
}

impl LeadDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Lead::COLLECTION),
        }
    }
}

#[async_trait]
impl LeadRepo for LeadDao {
    async fn insert(&self, mut lead: Lead) -> DaoResult<Lead> {
        let id = self.base.insert_one(&lead).await?;
        lead.id = Some(id);
        Ok(lead)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Lead>> {
        self.base.find_by_id(id).await
    }

    async fn save(&self, lead: &Lead) -> DaoResult<()> {
        let id = lead.id.ok_or(DaoError::NotFound)?;
        let mut fields = bson::to_document(lead)?;
        fields.remove("_id");
        // owned by mark_has_task
        fields.remove("has_task");
        let result = self
            .base
            .collection()
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .await
            .map_err(map_write_error)?;
        if result.matched_count == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    async fn mark_has_task(&self, id: ObjectId) -> DaoResult<()> {
        self.base
            .update_by_id(id, doc! { "$set": { "has_task": true } })
            .await?;
        Ok(())
    }

    async fn find_page(
        &self,
        query: &LeadQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Lead>> {
        self.base
            .find_paginated(query.to_document(), Some(doc! { "created_at": -1 }), params)
            .await
    }

    async fn count(&self, query: &LeadQuery) -> DaoResult<u64> {
        self.base.count(query.to_document()).await
    }

    async fn find_all(&self, query: &LeadQuery) -> DaoResult<Vec<Lead>> {
        self.base
            .find_many(query.to_document(), Some(doc! { "created_at": -1 }))
            .await
    }
}
