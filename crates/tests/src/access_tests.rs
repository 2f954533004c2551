use bson::oid::ObjectId;
use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::spawn().await;
    let resp = app.client.get(app.url("/api/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::spawn().await;
    let resp = app.client.get(app.url("/api/me")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn malformed_token_is_unauthorized() {
    let app = TestApp::spawn().await;
    let resp = app.auth_get("/api/me", "not-a-jwt").send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn token_for_unknown_user_is_unauthorized() {
    let app = TestApp::spawn().await;
    let token = app
        .state
        .auth
        .issue_access_token(ObjectId::new())
        .unwrap()
        .access_token;
    let resp = app.auth_get("/api/lead", &token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn deactivated_user_is_rejected() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_put(&format!("/api/user/{}/active", org.s2.id), &org.manager_a.access_token)
        .json(&serde_json::json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.auth_get("/api/me", &org.s2.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn me_returns_the_caller() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let resp = app.auth_get("/api/me", &org.s1.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["username"], "s1");
    assert_eq!(json["privilege"], "staff");
    assert_eq!(json["manager"], org.manager_a.id.as_str());
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn staff_cannot_read_reports() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    for path in ["/api/report/staff", "/api/report/call", "/api/report/lead"] {
        let resp = app.auth_get(path, &org.s1.access_token).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 403, "{path}");
    }
    let resp = app
        .auth_get("/api/report/lead", &org.manager_a.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let resp = app
        .auth_get("/api/lead/not-an-id", &org.s1.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
