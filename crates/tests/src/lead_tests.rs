use serde_json::{Value, json};

use crate::fixtures::seed::{SeededOrg, SeededUser, lead_body};
use crate::fixtures::test_app::TestApp;

/// The super admin's target tree for the current month.
async fn target_stats(app: &TestApp, org: &SeededOrg) -> Value {
    let resp = app
        .auth_get("/api/target/stats", &org.root.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.unwrap()
}

fn achieved(stats: &Value, username: &str) -> i64 {
    fn find<'a>(nodes: &'a Value, username: &str) -> Option<&'a Value> {
        nodes.as_array()?.iter().find_map(|node| {
            if node["username"] == username {
                Some(node)
            } else {
                find(&node["children"], username)
            }
        })
    }
    find(&stats["breakdown"], username)
        .and_then(|node| node["achieved"].as_i64())
        .unwrap_or_else(|| panic!("{username} missing from the target tree"))
}

async fn list_total(app: &TestApp, user: &SeededUser) -> u64 {
    let resp = app.auth_get("/api/lead", &user.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    json["total"].as_u64().unwrap()
}

#[tokio::test]
async fn staff_lead_is_visible_inside_the_branch_only() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000001", "Ravi")).await;

    assert_eq!(lead["enquire_status"], "new");
    assert_eq!(lead["handled_by"]["username"], "s1");
    assert_eq!(lead["manager"]["username"], "managerA");
    assert_eq!(lead["customer"]["phone"], "9000000001");

    assert_eq!(list_total(&app, &org.s1).await, 1);
    assert_eq!(list_total(&app, &org.manager_a).await, 1);
    assert_eq!(list_total(&app, &org.root).await, 1);
    assert_eq!(list_total(&app, &org.s2).await, 0);
    assert_eq!(list_total(&app, &org.manager_b).await, 0);

    let id = lead["id"].as_str().unwrap();
    let resp = app
        .auth_get(&format!("/api/lead/{id}"), &org.s3.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn list_reports_creation_counts_and_filters_by_status() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    app.create_lead(&org.s1, lead_body("9000000011", "Asha")).await;
    let second = app.create_lead(&org.s1, lead_body("9000000012", "Bala")).await;

    let resp = app
        .auth_put(
            &format!("/api/lead/{}/status", second["id"].as_str().unwrap()),
            &org.s1.access_token,
        )
        .json(&json!({ "enquire_status": "interested" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_get("/api/lead?status=interested&page=1&per_page=10", &org.s1.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["customer"]["name"], "Bala");
    assert_eq!(json["counts"]["today"], 2);

    let resp = app
        .auth_get("/api/lead?status=bogus", &org.s1.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["field"], "status");
}

#[tokio::test]
async fn short_phone_is_a_field_validation_error() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let resp = app
        .auth_post("/api/lead", &org.s1.access_token)
        .json(&lead_body("12345", "Tiny"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "validation");
    assert_eq!(json["field"], "phone");
}

#[tokio::test]
async fn call_center_win_credits_both_sides() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;

    let mut body = lead_body("9000000004", "Farah");
    let resp = app
        .auth_post("/api/lead", &org.agent.access_token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    body["manager"] = json!(org.manager_a.id);
    let lead = app.create_lead(&org.agent, body).await;
    assert_eq!(lead["handled_by"]["username"], "agent");

    let resp = app
        .auth_put(
            &format!("/api/lead/{}/status", lead["id"].as_str().unwrap()),
            &org.manager_a.access_token,
        )
        .json(&json!({ "enquire_status": "won" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["enquire_status"], "won");

    let stats = target_stats(&app, &org).await;
    assert_eq!(achieved(&stats, "managerA"), 1);
    assert_eq!(achieved(&stats, "agent"), 1);
    assert_eq!(achieved(&stats, "s1"), 0);
    assert_eq!(stats["overall"]["achieved"], 2);
}

#[tokio::test]
async fn transfer_moves_the_lead_and_pushes_to_the_new_handler() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000009", "Kavya")).await;
    let id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/lead/{id}/transfer"), &org.manager_a.access_token)
        .json(&json!({ "username": "managerB" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["handled_by"]["username"], "managerB");
    assert_eq!(json["manager"]["username"], "managerB");
    assert_eq!(json["created_by"]["username"], "s1");

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "device-managerB");

    let resp = app
        .auth_get("/api/notification", &org.manager_b.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 1);

    assert_eq!(list_total(&app, &org.manager_a).await, 0);
    assert_eq!(list_total(&app, &org.manager_b).await, 1);

    let resp = app
        .auth_post(&format!("/api/lead/{id}/transfer"), &org.manager_b.access_token)
        .json(&json!({ "username": "managerB" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn notes_show_up_in_the_lead_history() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    let lead = app.create_lead(&org.s1, lead_body("9000000021", "Mohan")).await;
    let id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_post(&format!("/api/lead/{id}/note"), &org.s1.access_token)
        .json(&json!({ "note": "Asked for a brochure" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = app
        .auth_post(&format!("/api/lead/{id}/note"), &org.s1.access_token)
        .json(&json!({ "note": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_get(&format!("/api/lead/{id}/activity"), &org.manager_a.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let kinds: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&"lead_added"));
    assert!(kinds.contains(&"note_added"));
}

#[tokio::test]
async fn existing_customer_is_found_by_phone() {
    let app = TestApp::spawn().await;
    let org = app.seed_org().await;
    app.create_lead(&org.s1, lead_body("9000000031", "Nila")).await;

    let resp = app
        .auth_get("/api/customer?phone=9000000031", &org.s2.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["name"], "Nila");
}
