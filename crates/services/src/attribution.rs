//! The single crediting rule shared by the target ledger and the reports.

use bson::oid::ObjectId;
use leadflow_db::models::User;

/// Users credited when `updater` closes a lead originated by `creator`: the
/// updater, plus the creator when it is a different call-center agent.
///
/// `created_by` never changes, so transfers in between have no effect on who
/// is credited.
pub fn credited_users(updater: ObjectId, creator: &User) -> Vec<ObjectId> {
    let mut credited = vec![updater];
    if let Some(creator_id) = creator.id {
        if creator_id != updater && creator.is_call_center() {
            credited.push(creator_id);
        }
    }
    credited
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;
    use leadflow_db::models::{Privilege, SecondPrivilege};

    fn user(second: SecondPrivilege) -> User {
        let now = DateTime::now();
        User {
            id: Some(ObjectId::new()),
            username: "creator".to_string(),
            display_name: "Creator".to_string(),
            phone: None,
            email: None,
            password_hash: None,
            privilege: Privilege::Staff,
            second_privilege: second,
            manager: None,
            created_by: None,
            is_active: true,
            fcm_token: None,
            dob: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn call_center_creator_is_credited_alongside_updater() {
        let creator = user(SecondPrivilege::CallCenter);
        let updater = ObjectId::new();
        assert_eq!(
            credited_users(updater, &creator),
            vec![updater, creator.id.unwrap()]
        );
    }

    #[test]
    fn call_center_creator_closing_own_lead_is_credited_once() {
        let creator = user(SecondPrivilege::CallCenter);
        let id = creator.id.unwrap();
        assert_eq!(credited_users(id, &creator), vec![id]);
    }

    #[test]
    fn regular_creator_is_not_credited() {
        let creator = user(SecondPrivilege::Regular);
        let updater = ObjectId::new();
        assert_eq!(credited_users(updater, &creator), vec![updater]);
    }
}
