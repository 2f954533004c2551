use bson::DateTime;
use leadflow_db::models::{Privilege, SecondPrivilege, User};
use serde_json::{Value, json};

use super::test_app::TestApp;

/// A super admin, two branches and a call-center agent, created through
/// the API the way an operator would.
pub struct SeededOrg {
    pub root: SeededUser,
    pub manager_a: SeededUser,
    pub manager_b: SeededUser,
    pub s1: SeededUser,
    pub s2: SeededUser,
    pub s3: SeededUser,
    pub agent: SeededUser,
}

pub struct SeededUser {
    pub id: String,
    pub username: String,
    pub access_token: String,
}

pub const PASSWORD: &str = "Password123!";

impl TestApp {
    /// Inserts the super admin straight into the store; nobody can create it
    /// through the API.
    pub async fn seed_super_admin(&self, username: &str) -> SeededUser {
        let now = DateTime::now();
        let user = self
            .repos
            .users
            .insert(User {
                id: None,
                username: username.to_string(),
                display_name: "Root".to_string(),
                phone: None,
                email: None,
                password_hash: Some(self.state.auth.hash_password(PASSWORD).unwrap()),
                privilege: Privilege::Admin,
                second_privilege: SecondPrivilege::Super,
                manager: None,
                created_by: None,
                is_active: true,
                fcm_token: Some(format!("device-{username}")),
                dob: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("Failed to insert super admin");
        let id = user.id.unwrap();
        SeededUser {
            id: id.to_hex(),
            username: username.to_string(),
            access_token: self.state.auth.issue_access_token(id).unwrap().access_token,
        }
    }

    /// Creates a user through `POST /api/user` and registers a device for it.
    pub async fn create_user(&self, creator: &SeededUser, body: Value) -> SeededUser {
        let resp = self
            .auth_post("/api/user", &creator.access_token)
            .json(&body)
            .send()
            .await
            .expect("Create user request failed");
        let status = resp.status();
        let json: Value = resp.json().await.unwrap_or_default();
        assert_eq!(status.as_u16(), 201, "Create user failed: {json}");

        let id = json["id"].as_str().unwrap().to_string();
        let username = json["username"].as_str().unwrap().to_string();
        let access_token = self
            .state
            .auth
            .issue_access_token(bson::oid::ObjectId::parse_str(&id).unwrap())
            .unwrap()
            .access_token;

        let resp = self
            .auth_put("/api/me/device", &access_token)
            .json(&json!({ "token": format!("device-{username}") }))
            .send()
            .await
            .expect("Register device request failed");
        assert_eq!(resp.status().as_u16(), 204);

        SeededUser {
            id,
            username,
            access_token,
        }
    }

    pub async fn seed_org(&self) -> SeededOrg {
        let root = self.seed_super_admin("root").await;
        let manager_a = self
            .create_user(&root, user_body("managerA", "manager", None, None))
            .await;
        let manager_b = self
            .create_user(&root, user_body("managerB", "manager", None, None))
            .await;
        let s1 = self
            .create_user(&manager_a, user_body("s1", "staff", None, None))
            .await;
        let s2 = self
            .create_user(&manager_a, user_body("s2", "staff", None, None))
            .await;
        let s3 = self
            .create_user(&root, user_body("s3", "staff", None, Some(&manager_b.id)))
            .await;
        let agent = self
            .create_user(&root, user_body("agent", "staff", Some("call-center"), None))
            .await;

        SeededOrg {
            root,
            manager_a,
            manager_b,
            s1,
            s2,
            s3,
            agent,
        }
    }

    /// Creates a lead and returns its JSON view.
    pub async fn create_lead(&self, user: &SeededUser, body: Value) -> Value {
        let resp = self
            .auth_post("/api/lead", &user.access_token)
            .json(&body)
            .send()
            .await
            .expect("Create lead request failed");
        let status = resp.status();
        let json: Value = resp.json().await.unwrap_or_default();
        assert_eq!(status.as_u16(), 201, "Create lead failed: {json}");
        json
    }
}

pub fn user_body(
    username: &str,
    privilege: &str,
    second_privilege: Option<&str>,
    manager: Option<&str>,
) -> Value {
    let mut body = json!({
        "username": username,
        "display_name": username.to_uppercase(),
        "password": PASSWORD,
        "phone": "9876543210",
        "privilege": privilege,
    });
    if let Some(second) = second_privilege {
        body["second_privilege"] = json!(second);
    }
    if let Some(manager) = manager {
        body["manager"] = json!(manager);
    }
    body
}

pub fn lead_body(phone: &str, name: &str) -> Value {
    json!({
        "phone": phone,
        "name": name,
        "source": "walkin",
        "purpose": "purchase",
        "type": "fresh",
        "product": "Scooter",
    })
}
