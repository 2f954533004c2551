use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::domain_enum;
use super::lead::CallStatus;

domain_enum! {
    pub enum TaskCategory {
        Call => "call",
        Sales => "sales",
        Meeting => "meeting",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub lead: ObjectId,
    pub assigned: ObjectId,
    pub created_by: ObjectId,
    pub category: TaskCategory,
    pub title: String,
    pub description: String,
    pub due: DateTime,
    #[serde(default)]
    pub is_completed: bool,
    pub completed_at: Option<DateTime>,
    pub completed_by: Option<ObjectId>,
    /// Call outcome captured when the task was completed.
    pub call_status: Option<CallStatus>,
    /// Follow-up task spawned by completing this one.
    pub follow_up: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Task {
    pub const COLLECTION: &'static str = "tasks";
}
