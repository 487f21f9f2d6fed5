mod common;

use common::{TestApp, SCENARIO_CUSTOMER};
use data_api_service::handlers::legacy::LEGACY_HINT;
use serde_json::{json, Value};

#[tokio::test]
async fn missing_customer_id_returns_hint() {
    let app = TestApp::spawn_seeded().await;

    let response = app.get("/api").await;
    assert_eq!(response.status().as_u16(), 404);

    let content_type = response
        .headers()
        .get("content-type")
        .expect("Missing content-type header")
        .to_str()
        .expect("Invalid content-type")
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.expect("Failed to get response body");
    assert_eq!(body, LEGACY_HINT);
    assert!(body.contains("?customerid="));
}

#[tokio::test]
async fn unknown_customer_returns_hint() {
    let app = TestApp::spawn_seeded().await;

    let response = app.get("/api?customerid=LA-SG_00000000").await;
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.text().await.unwrap(), LEGACY_HINT);
}

#[tokio::test]
async fn query_parameter_returns_composite() {
    let app = TestApp::spawn_seeded().await;

    let response = app
        .get(&format!("/api?customerid={}", SCENARIO_CUSTOMER))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["policy"][0]["policyno"], "P1");
    assert_eq!(body["agent"][0]["agent_no"], "AG1");
}

#[tokio::test]
async fn json_body_returns_composite() {
    let app = TestApp::spawn_seeded().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api", app.address))
        .json(&json!({ "customerid": SCENARIO_CUSTOMER }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["customer"][0]["id"], SCENARIO_CUSTOMER);
    assert_eq!(body["options"][0]["policyid"], "P1");
}

#[tokio::test]
async fn unparseable_query_returns_hint() {
    let app = TestApp::spawn_seeded().await;

    let response = app
        .get(&format!(
            "/api?customerid={}&customerid=other",
            SCENARIO_CUSTOMER
        ))
        .await;
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.text().await.unwrap(), LEGACY_HINT);
}

#[tokio::test]
async fn unparseable_query_falls_back_to_json_body() {
    let app = TestApp::spawn_seeded().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api?customerid=a&customerid=b", app.address))
        .json(&json!({ "customerid": SCENARIO_CUSTOMER }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
}
