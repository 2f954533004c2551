use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::domain_enum;

domain_enum! {
    pub enum EnquireSource {
        Call => "call",
        Facebook => "facebook",
        Instagram => "instagram",
        PreviousCustomer => "previous customer",
        Wabis => "wabis",
        Walkin => "walkin",
        Whatsapp => "whatsapp",
    }
}

domain_enum! {
    pub enum Purpose {
        Inquire => "inquire",
        Purchase => "purchase",
        Sales => "sales",
        ServiceRequest => "service request",
    }
}

domain_enum! {
    /// Pipeline stage of a lead. `Won` and `Lost` are terminal for task
    /// purposes.
    pub enum EnquireStatus {
        Empty => "empty",
        Contacted => "contacted",
        Interested => "interested",
        Lost => "lost",
        New => "new",
        None => "none",
        Pending => "pending",
        QuotationShared => "quotation shared",
        VisitStore => "visit store",
        Won => "won",
    }
}

impl EnquireStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnquireStatus::Won | EnquireStatus::Lost)
    }
}

domain_enum! {
    pub enum LeadType {
        Fresh => "fresh",
        Used => "used",
    }
}

domain_enum! {
    pub enum CallStatus {
        Connected => "connected",
        NotConnected => "not connected",
        FollowUpScheduled => "follow up scheduled",
        CallBackRequested => "call back requested",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub customer: ObjectId,
    pub source: EnquireSource,
    pub enquire_status: EnquireStatus,
    pub purpose: Purpose,
    pub call_status: Option<CallStatus>,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub product: String,
    /// Original submitter; never changes after creation.
    pub created_by: ObjectId,
    /// Current owner; changes on transfer.
    pub handled_by: ObjectId,
    /// Branch manager owning the lead.
    pub manager: ObjectId,
    /// Set once the lead gets its first task; never cleared.
    #[serde(default)]
    pub has_task: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Lead {
    pub const COLLECTION: &'static str = "leads";
}
