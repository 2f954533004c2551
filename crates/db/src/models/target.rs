use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Monthly goal and achievement counter for one user. `month` is always the
/// first day of the month at midnight UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub assigned: ObjectId,
    pub month: DateTime,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub achieved: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Target {
    pub const COLLECTION: &'static str = "targets";
}
