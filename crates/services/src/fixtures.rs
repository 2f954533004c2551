//! A seeded two-branch organisation over the in-memory store.

use std::sync::Arc;

use bson::{oid::ObjectId, DateTime};
use leadflow_config::JwtSettings;
use leadflow_db::models::{EnquireSource, LeadType, Privilege, Purpose, SecondPrivilege, User};

use crate::auth::AuthService;
use crate::customer::CustomerData;
use crate::engine::Engine;
use crate::hierarchy::RequesterContext;
use crate::lead::CreateLeadInput;
use crate::notification::RecordingPushSender;
use crate::repo::Repositories;

pub struct Org {
    pub engine: Engine,
    pub repos: Repositories,
    pub push: Arc<RecordingPushSender>,
    pub super_admin: User,
    pub admin: User,
    pub manager_a: User,
    pub manager_b: User,
    pub s1: User,
    pub s2: User,
    pub s3: User,
    pub call_center: User,
}

pub fn auth() -> Arc<AuthService> {
    Arc::new(AuthService::new(JwtSettings {
        secret: "fixture-secret".to_string(),
        access_token_ttl_secs: 3600,
        issuer: "leadflow-fixture".to_string(),
    }))
}

async fn insert_user(
    repos: &Repositories,
    username: &str,
    privilege: Privilege,
    second_privilege: SecondPrivilege,
    manager: Option<ObjectId>,
    created_by: Option<ObjectId>,
) -> User {
    let now = DateTime::now();
    repos
        .users
        .insert(User {
            id: None,
            username: username.to_string(),
            display_name: display_name(username),
            phone: None,
            email: None,
            password_hash: None,
            privilege,
            second_privilege,
            manager,
            created_by,
            is_active: true,
            fcm_token: Some(format!("device-{username}")),
            dob: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

fn display_name(username: &str) -> String {
    let mut chars = username.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Org {
    /// super admin, a regular admin, managers A and B (A created by the
    /// regular admin), staff s1 and s2 under A, s3 under B and a
    /// call-center agent without a manager.
    pub async fn seed() -> Self {
        Self::seed_with(Repositories::in_memory()).await
    }

    /// Same organisation over caller-supplied repositories.
    pub async fn seed_with(repos: Repositories) -> Self {
        let push = Arc::new(RecordingPushSender::default());
        let engine = Engine::new(repos.clone(), push.clone(), auth());

        use Privilege::*;
        use SecondPrivilege::{CallCenter, Regular, Super};
        let super_admin = insert_user(&repos, "root", Admin, Super, None, None).await;
        let admin = insert_user(&repos, "admin", Admin, Regular, None, super_admin.id).await;
        let manager_a = insert_user(&repos, "managerA", Manager, Regular, None, admin.id).await;
        let manager_b =
            insert_user(&repos, "managerB", Manager, Regular, None, super_admin.id).await;
        let s1 = insert_user(&repos, "s1", Staff, Regular, manager_a.id, manager_a.id).await;
        let s2 = insert_user(&repos, "s2", Staff, Regular, manager_a.id, manager_a.id).await;
        let s3 = insert_user(&repos, "s3", Staff, Regular, manager_b.id, manager_b.id).await;
        let call_center = insert_user(&repos, "agent", Staff, CallCenter, None, admin.id).await;

        Self {
            engine,
            repos,
            push,
            super_admin,
            admin,
            manager_a,
            manager_b,
            s1,
            s2,
            s3,
            call_center,
        }
    }

    pub fn ctx(&self, user: &User) -> RequesterContext {
        RequesterContext::from_user(user).unwrap()
    }
}

pub fn id(user: &User) -> ObjectId {
    user.id.unwrap()
}

pub fn lead_input(phone: &str, name: &str) -> CreateLeadInput {
    CreateLeadInput {
        phone: phone.to_string(),
        customer: CustomerData {
            name: name.to_string(),
            ..Default::default()
        },
        source: EnquireSource::Walkin,
        enquire_status: None,
        purpose: Purpose::Purchase,
        call_status: None,
        lead_type: LeadType::Fresh,
        product: "Scooter".to_string(),
        manager: None,
    }
}
