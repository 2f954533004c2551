use std::sync::Arc;

use bson::DateTime;
use leadflow_db::models::Customer;
use tracing::info;

use crate::dao::base::DaoError;
use crate::error::{ServiceError, ServiceResult};
use crate::repo::CustomerRepo;

#[derive(Debug, Clone, Default)]
pub struct CustomerData {
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub dob: Option<DateTime>,
}

/// Customers deduplicated by phone number.
#[derive(Clone)]
pub struct CustomerBook {
    customers: Arc<dyn CustomerRepo>,
}

impl CustomerBook {
    pub fn new(customers: Arc<dyn CustomerRepo>) -> Self {
        Self { customers }
    }

    /// Returns the customer registered for `phone`, creating it from `data`
    /// on first sight. An existing customer is returned unchanged.
    pub async fn find_or_create(&self, phone: &str, data: CustomerData) -> ServiceResult<Customer> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ServiceError::validation("phone", "Phone number is required"));
        }
        if let Some(existing) = self.customers.find_by_phone(phone).await? {
            return Ok(existing);
        }
        if data.name.trim().is_empty() {
            return Err(ServiceError::validation("name", "Name is required"));
        }

        let now = DateTime::now();
        let customer = Customer {
            id: None,
            phone: phone.to_string(),
            name: data.name.trim().to_string(),
            email: data.email,
            address: data.address,
            dob: data.dob,
            created_at: now,
            updated_at: now,
        };
        match self.customers.insert(customer).await {
            Ok(created) => {
                info!(phone, "Customer created");
                Ok(created)
            }
            // Lost a race with a concurrent submission for the same phone.
            Err(DaoError::DuplicateKey(_)) => self
                .customers
                .find_by_phone(phone)
                .await?
                .ok_or_else(|| ServiceError::not_found("Customer")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_phone(&self, phone: &str) -> ServiceResult<Customer> {
        self.customers
            .find_by_phone(phone.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer"))
    }

    /// Ids of customers whose name or phone contains `text`.
    pub async fn search_ids(&self, text: &str) -> ServiceResult<Vec<bson::oid::ObjectId>> {
        let found = self.customers.search(text.trim()).await?;
        Ok(found.into_iter().filter_map(|c| c.id).collect())
    }

    pub async fn find_by_ids(&self, ids: &[bson::oid::ObjectId]) -> ServiceResult<Vec<Customer>> {
        Ok(self.customers.find_by_ids(ids).await?)
    }

    pub async fn find_by_id(&self, id: bson::oid::ObjectId) -> ServiceResult<Customer> {
        self.customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer"))
    }
}
