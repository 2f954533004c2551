use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use leadflow_db::models::Customer;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};
use crate::repo::CustomerRepo;

pub struct CustomerDao {
    pub base: BaseDao<Customer>,
}

impl CustomerDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Customer::COLLECTION),
        }
    }
}

/// Escapes regex metacharacters so user input is matched literally.
pub(crate) fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CustomerRepo for CustomerDao {
    async fn insert(&self, mut customer: Customer) -> DaoResult<Customer> {
        let id = self.base.insert_one(&customer).await?;
        customer.id = Some(id);
        Ok(customer)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Option<Customer>> {
        self.base.find_by_id(id).await
    }

    async fn find_by_phone(&self, phone: &str) -> DaoResult<Option<Customer>> {
        self.base.find_one(doc! { "phone": phone }).await
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Customer>> {
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
    }

    async fn search(&self, text: &str) -> DaoResult<Vec<Customer>> {
        let pattern = escape_regex(text);
        self.base
            .find_many(
                doc! {
                    "$or": [
                        { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                        { "phone": { "$regex": pattern.as_str(), "$options": "i" } },
                    ]
                },
                None,
            )
            .await
    }
}
