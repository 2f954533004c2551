use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A contact deduplicated by phone number and shared by every lead
/// submitted for that phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub dob: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Customer {
    pub const COLLECTION: &'static str = "customers";
}
