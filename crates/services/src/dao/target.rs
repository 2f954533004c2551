use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime};
use leadflow_db::models::Target;
use mongodb::{options::ReturnDocument, Database};

use super::base::{map_write_error, BaseDao, DaoError, DaoResult};
use crate::repo::TargetRepo;

pub struct TargetDao {
    pub base: BaseDao<Target>,
}

impl TargetDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Target::COLLECTION),
        }
    }

    async fn upsert(&self, assigned: ObjectId, month: DateTime, update: bson::Document) -> DaoResult<Target> {
        self.base
            .collection()
            .find_one_and_update(doc! { "assigned": assigned, "month": month }, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_write_error)?
            .ok_or(DaoError::NotFound)
    }
}

#[async_trait]
impl TargetRepo for TargetDao {
    async fn increment_achieved(&self, assigned: ObjectId, month: DateTime) -> DaoResult<Target> {
        let now = DateTime::now();
        self.upsert(
            assigned,
            month,
            doc! {
                "$inc": { "achieved": 1_i64 },
                "$set": { "updated_at": now },
                "$setOnInsert": { "total": 0_i64, "created_at": now },
            },
        )
        .await
    }

    async fn set_total(
        &self,
        assigned: ObjectId,
        month: DateTime,
        total: i64,
    ) -> DaoResult<Target> {
        let now = DateTime::now();
        self.upsert(
            assigned,
            month,
            doc! {
                "$set": { "total": total, "updated_at": now },
                "$setOnInsert": { "achieved": 0_i64, "created_at": now },
            },
        )
        .await
    }

    async fn find(&self, assigned: ObjectId, month: DateTime) -> DaoResult<Option<Target>> {
        self.base
            .find_one(doc! { "assigned": assigned, "month": month })
            .await
    }

    async fn find_for_users(&self, users: &[ObjectId], month: DateTime) -> DaoResult<Vec<Target>> {
        self.base
            .find_many(doc! { "assigned": { "$in": users.to_vec() }, "month": month }, None)
            .await
    }
}
