use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::domain_enum;

domain_enum! {
    pub enum LeaveStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leave {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub requester: ObjectId,
    pub reason: String,
    pub date: DateTime,
    pub status: LeaveStatus,
    pub reviewed_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Leave {
    pub const COLLECTION: &'static str = "leaves";
}
