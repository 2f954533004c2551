use serde_json::{Value, json};

use crate::fixtures::seed::lead_body;
use crate::fixtures::test_app::TestApp;

/// Current wall-clock time as IST millis.
fn ist_now() -> i64 {
    bson::DateTime::now().timestamp_millis() + 19_800_000
}

#[tokio::test]
async fn branch_tree_rolls_up_staff_achievements() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_put("/api/target", &org.root.access_token)
        .json(&json!({ "assigned": org.manager_a.id, "month": ist_now(), "total": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_put("/api/target", &org.manager_a.access_token)
        .json(&json!({ "assigned": org.s1.id, "month": ist_now(), "total": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let target: Value = resp.json().await.unwrap();
    assert_eq!(target["total"], 4);
    assert_eq!(target["achieved"], 0);

    let lead = app.create_lead(&org.s1, lead_body("9000000201", "Zoya")).await;
    let resp = app
        .auth_put(
            &format!("/api/lead/{}/status", lead["id"].as_str().unwrap()),
            &org.s1.access_token,
        )
        .json(&json!({ "enquire_status": "won" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get("/api/target/stats", &org.manager_a.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let stats: Value = resp.json().await.unwrap();
    let node = &stats["breakdown"][0];
    assert_eq!(node["username"], "managerA");
    assert_eq!(node["total"], 10);
    assert_eq!(node["achieved"], 1);
    let s1 = node["children"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["username"] == "s1")
        .unwrap();
    assert_eq!(s1["total"], 4);
    assert_eq!(s1["achieved"], 1);
}

#[tokio::test]
async fn target_writes_are_checked() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let resp = app
        .auth_put("/api/target", &org.manager_a.access_token)
        .json(&json!({ "assigned": org.s1.id, "month": ist_now(), "total": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["field"], "total");

    let resp = app
        .auth_put("/api/target", &org.manager_a.access_token)
        .json(&json!({ "assigned": org.s3.id, "month": ist_now(), "total": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_put("/api/target", &org.s1.access_token)
        .json(&json!({ "assigned": org.s1.id, "month": ist_now(), "total": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}
