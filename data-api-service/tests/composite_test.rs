mod common;

use common::{TestApp, SCENARIO_CUSTOMER};
use data_api_service::error::StoreError;
use data_api_service::models::CollectionKind;
use serde_json::{json, Value};

#[tokio::test]
async fn composite_returns_all_four_collections() {
    let app = TestApp::spawn_seeded().await;

    let response = app.get(&format!("/api/{}", SCENARIO_CUSTOMER)).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(
        body,
        json!({
            "customer": [{ "id": SCENARIO_CUSTOMER }],
            "policy": [{ "policyno": "P1", "servingagentid": "AG1", "customerid": SCENARIO_CUSTOMER }],
            "agent": [{ "agent_no": "AG1" }],
            "options": [{ "policyid": "P1" }],
        })
    );
}

#[tokio::test]
async fn customer_without_policy_is_not_found() {
    let app = TestApp::spawn().await;
    app.seed(CollectionKind::Customer, json!({ "id": "C-NOPOLICY" }))
        .await;

    let response = app.get("/api/C-NOPOLICY").await;
    assert_eq!(response.status().as_u16(), 404);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unavailable_store_is_503_not_empty_200() {
    let app = TestApp::spawn_seeded().await;
    app.store
        .set_failure(Some(StoreError::unavailable(
            "server selection timeout: 10.0.0.4:10255",
        )))
        .await;

    let response = app.get(&format!("/api/{}", SCENARIO_CUSTOMER)).await;
    assert_eq!(response.status().as_u16(), 503);

    let body = response.text().await.expect("Failed to get response body");
    assert!(!body.contains("10.0.0.4"), "provider detail leaked: {}", body);
}

#[tokio::test]
async fn throttled_store_is_429() {
    let app = TestApp::spawn_seeded().await;
    app.store
        .set_failure(Some(StoreError::Throttled { retry_after: None }))
        .await;

    let response = app.get(&format!("/api/{}", SCENARIO_CUSTOMER)).await;
    assert_eq!(response.status().as_u16(), 429);
}

#[tokio::test]
async fn malformed_policy_is_bad_gateway() {
    let app = TestApp::spawn().await;
    app.seed(
        CollectionKind::Policy,
        json!({ "policyno": "P1", "customerid": "C-BROKEN" }),
    )
    .await;

    let response = app.get("/api/C-BROKEN").await;
    assert_eq!(response.status().as_u16(), 502);
}
