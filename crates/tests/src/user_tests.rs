use serde_json::Value;

use crate::fixtures::seed::user_body;
use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn manager_creates_staff_in_its_own_branch_only() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_post("/api/user", &org.manager_a.access_token)
        .json(&user_body("agent2", "staff", Some("call-center"), None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/user", &org.manager_a.access_token)
        .json(&user_body("boss", "manager", None, None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/user", &org.s1.access_token)
        .json(&user_body("s9", "staff", None, None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get("/api/user/staff", &org.manager_a.access_token)
        .send()
        .await
        .unwrap();
    let staff: Vec<Value> = resp.json().await.unwrap();
    let mut names: Vec<&str> = staff.iter().map(|u| u["username"].as_str().unwrap()).collect();
    names.sort();
    assert_eq!(names, vec!["s1", "s2"]);
}

#[tokio::test]
async fn user_input_is_validated_per_field() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let mut body = user_body("short", "manager", None, None);
    body["password"] = "abc".into();
    let resp = app
        .auth_post("/api/user", &org.root.access_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["field"], "password");

    let resp = app
        .auth_post("/api/user", &org.root.access_token)
        .json(&user_body("s1", "manager", None, None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let resp = app
        .auth_post("/api/user", &org.root.access_token)
        .json(&user_body("orphan", "staff", None, None))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["field"], "manager");
}

#[tokio::test]
async fn manager_with_active_staff_cannot_be_deactivated() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_put(&format!("/api/user/{}/active", org.manager_a.id), &org.root.access_token)
        .json(&serde_json::json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let resp = app
        .auth_put(&format!("/api/user/{}/active", org.s3.id), &org.manager_a.access_token)
        .json(&serde_json::json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn transfer_targets_follow_the_caller_role() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_get("/api/user/transfer-target", &org.s1.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let users: Vec<Value> = resp.json().await.unwrap();
    let names: Vec<&str> = users.iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert!(names.contains(&"managerA"));
    assert!(names.contains(&"s2"));
    assert!(!names.contains(&"s1"));
    assert!(!names.contains(&"managerB"));
    assert!(!names.contains(&"root"));
}

#[tokio::test]
async fn managers_listing_is_admin_only() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_get("/api/user/manager", &org.root.access_token)
        .send()
        .await
        .unwrap();
    let managers: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(managers.len(), 2);

    let resp = app
        .auth_get("/api/user/manager", &org.manager_a.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}
