#![allow(dead_code)]

use data_api_service::config::DataApiConfig;
use data_api_service::models::CollectionKind;
use data_api_service::services::InMemoryStore;
use data_api_service::startup::Application;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use std::sync::Arc;

pub const TEST_DATABASE: &str = "insurance";
pub const SCENARIO_CUSTOMER: &str = "LA-SG_21104577";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: InMemoryStore,
}

pub fn test_config() -> DataApiConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("STORE_ENDPOINT", "mongodb://localhost:27017"),
        ("STORE_KEY", "test-key"),
        ("STORE_DATABASE", TEST_DATABASE),
        ("STORE_STARTUP_TIMEOUT_SECS", "1"),
    ]);

    let mut common = CoreConfig::default();
    common.port = 0; // Random port for testing

    DataApiConfig::from_lookup(common, |key| vars.get(key).map(|v| v.to_string()))
        .expect("Failed to build test configuration")
}

impl TestApp {
    /// Spawns the application on an empty in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with_store(InMemoryStore::new()).await
    }

    /// Spawns the application with the canonical customer scenario seeded.
    pub async fn spawn_seeded() -> Self {
        let store = InMemoryStore::new();
        seed_scenario(&store).await;
        Self::spawn_with_store(store).await
    }

    pub async fn spawn_with_store(store: InMemoryStore) -> Self {
        let app = Application::build_with_store(test_config(), Arc::new(store.clone()))
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
        }
    }

    pub async fn seed(&self, kind: CollectionKind, record: Value) {
        self.store.insert(TEST_DATABASE, &kind.spec(), record).await;
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub async fn seed_scenario(store: &InMemoryStore) {
    let records = [
        (
            CollectionKind::Policy,
            json!({ "policyno": "P1", "servingagentid": "AG1", "customerid": SCENARIO_CUSTOMER }),
        ),
        (CollectionKind::Customer, json!({ "id": SCENARIO_CUSTOMER })),
        (CollectionKind::Agent, json!({ "agent_no": "AG1" })),
        (CollectionKind::Options, json!({ "policyid": "P1" })),
    ];

    for (kind, record) in records {
        store.insert(TEST_DATABASE, &kind.spec(), record).await;
    }
}
