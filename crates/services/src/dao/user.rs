use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use leadflow_db::models::User;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};
use crate::query::UserQuery;
use crate::repo::UserRepo;

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }
}

#[async_trait]
impl UserRepo for UserDao {
    async fn insert(&self, mut user: User) -> DaoResult<User> {
        let id = self.base.insert_one(&user).await?;
        user.id = Some(id);
        Ok(user)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<User>> {
        self.base.find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> DaoResult<Option<User>> {
        self.base.find_one(doc! { "username": username }).await
    }

    async fn find_many(&self, query: &UserQuery) -> DaoResult<Vec<User>> {
        self.base
            .find_many(query.to_document(), Some(doc! { "username": 1 }))
            .await
    }

    async fn set_active(&self, id: ObjectId, active: bool) -> DaoResult<bool> {
        self.base
            .update_by_id(id, doc! { "$set": { "is_active": active } })
            .await
    }

    async fn set_fcm_token(&self, id: ObjectId, token: Option<String>) -> DaoResult<bool> {
        self.base
            .update_by_id(
                id,
                doc! { "$set": { "fcm_token": token, "updated_at": bson::DateTime::now() } },
            )
            .await
    }
}
