use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::domain_enum;

domain_enum! {
    pub enum ActivityKind {
        LeadAdded => "lead_added",
        LeadUpdated => "lead_updated",
        StatusUpdated => "status_updated",
        PurposeUpdated => "purpose_updated",
        CallStatusUpdated => "call_status_updated",
        LeadTransfer => "lead_transfer",
        TaskAdded => "task_added",
        NoteAdded => "note_added",
        Completed => "completed",
        FollowupAdded => "followup_added",
    }
}

/// Append-only audit record. `action` is rendered once at write time and
/// never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub activator: ObjectId,
    pub lead: ObjectId,
    pub task: Option<ObjectId>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub action: String,
    pub optional_message: Option<String>,
    pub change: Option<ActivityChange>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityChange {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl Activity {
    pub const COLLECTION: &'static str = "activities";
}
