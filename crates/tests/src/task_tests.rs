use serde_json::{Value, json};

use crate::fixtures::seed::lead_body;
use crate::fixtures::test_app::TestApp;

const HOUR_MS: i64 = 3_600_000;

fn now_millis() -> i64 {
    bson::DateTime::now().timestamp_millis()
}

#[tokio::test]
async fn one_open_task_per_lead() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000101", "Usha")).await;
    let body = json!({
        "lead": lead["id"],
        "category": "call",
        "due": now_millis() + HOUR_MS,
    });

    let resp = app
        .auth_post("/api/task", &org.s1.access_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["assigned"]["username"], "s1");
    assert_eq!(task["lead"]["customer_name"], "Usha");
    assert_eq!(task["is_completed"], false);

    let resp = app
        .auth_post("/api/task", &org.manager_a.access_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "conflict");
}

#[tokio::test]
async fn completing_updates_the_lead_and_schedules_a_follow_up() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000102", "Vikram")).await;

    let resp = app
        .auth_post("/api/task", &org.manager_a.access_token)
        .json(&json!({
            "lead": lead["id"],
            "assigned": org.s1.id,
            "category": "call",
            "due": now_millis(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let task: Value = resp.json().await.unwrap();
    let task_id = task["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/task/{task_id}/complete"), &org.s1.access_token)
        .json(&json!({
            "enquire_status": "interested",
            "call_status": "connected",
            "note": "Wants a test ride",
            "follow_up": now_millis() + 24 * HOUR_MS,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["task"]["is_completed"], true);
    assert_eq!(json["task"]["call_status"], "connected");
    assert_eq!(json["lead"]["enquire_status"], "interested");
    assert_eq!(json["follow_up"]["is_completed"], false);
    assert_eq!(json["task"]["follow_up"], json["follow_up"]["id"]);
    assert!(json.get("warning").is_none());

    let resp = app
        .auth_post(&format!("/api/task/{task_id}/complete"), &org.s1.access_token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn winning_through_a_task_skips_the_follow_up() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000103", "Wasim")).await;

    let resp = app
        .auth_post("/api/task", &org.s1.access_token)
        .json(&json!({ "lead": lead["id"], "category": "sales", "due": now_millis() }))
        .send()
        .await
        .unwrap();
    let task: Value = resp.json().await.unwrap();

    let resp = app
        .auth_post(
            &format!("/api/task/{}/complete", task["id"].as_str().unwrap()),
            &org.s1.access_token,
        )
        .json(&json!({
            "enquire_status": "won",
            "follow_up": now_millis() + HOUR_MS,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["lead"]["enquire_status"], "won");
    assert!(json["follow_up"].is_null());
    assert!(json["warning"].is_string());
}

#[tokio::test]
async fn other_branches_cannot_see_the_task() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000104", "Yamini")).await;
    let resp = app
        .auth_post("/api/task", &org.s1.access_token)
        .json(&json!({ "lead": lead["id"], "category": "meeting", "due": now_millis() }))
        .send()
        .await
        .unwrap();
    let task: Value = resp.json().await.unwrap();
    let path = format!("/api/task/{}", task["id"].as_str().unwrap());

    let resp = app.auth_get(&path, &org.manager_a.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.auth_get(&path, &org.s3.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get("/api/task?completed=false", &org.manager_b.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn out_of_range_timestamps_are_rejected() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000109", "Yash")).await;

    let resp = app
        .auth_post("/api/task", &org.s1.access_token)
        .json(&json!({
            "lead": lead["id"],
            "category": "call",
            "due": i64::MIN,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["field"], "due");

    let resp = app
        .auth_get(
            &format!("/api/task?start=0&end={}", i64::MAX),
            &org.s1.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["field"], "end");
}
