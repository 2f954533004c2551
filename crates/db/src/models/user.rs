use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::domain_enum;

domain_enum! {
    pub enum Privilege {
        Admin => "admin",
        Manager => "manager",
        Staff => "staff",
    }
}

domain_enum! {
    /// Refines the primary privilege: `Super` distinguishes the owning admin,
    /// `CallCenter` marks staff who originate leads for other branches.
    pub enum SecondPrivilege {
        Super => "super",
        CallCenter => "call-center",
        Regular => "regular",
    }
}

impl Default for SecondPrivilege {
    fn default() -> Self {
        SecondPrivilege::Regular
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub privilege: Privilege,
    #[serde(default)]
    pub second_privilege: SecondPrivilege,
    /// Only staff carry a manager; it is always empty for managers and admins.
    pub manager: Option<ObjectId>,
    pub created_by: Option<ObjectId>,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    pub fcm_token: Option<String>,
    pub dob: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn bool_true() -> bool {
    true
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn is_call_center(&self) -> bool {
        self.second_privilege == SecondPrivilege::CallCenter
    }
}
