//! In-process `DocumentStore` used by the test suite and for local runs
//! without a database.

use super::store::{
    CollectionHandle, DatabaseHandle, DocumentStore, PointRead, QueryResponse, RecordQuery,
};
use crate::error::{ResourceKind, StoreError};
use crate::models::{CollectionSpec, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryCollection {
    partition_key: String,
    records: Vec<Record>,
}

#[derive(Debug, Default)]
struct MemoryState {
    databases: HashMap<String, HashMap<String, MemoryCollection>>,
    failure: Option<StoreError>,
    query_log: Vec<String>,
    request_charge: Option<f64>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that reports `charge` on every query and point read.
    pub fn with_request_charge(charge: f64) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                request_charge: Some(charge),
                ..MemoryState::default()
            })),
        }
    }

    /// Inserts a record, creating the database and collection if needed.
    /// Non-object values are ignored.
    pub async fn insert(&self, database: &str, spec: &CollectionSpec, record: Value) {
        let Value::Object(record) = record else {
            tracing::warn!(collection = %spec.name, "Ignoring non-object record");
            return;
        };

        let mut state = self.state.write().await;
        let collection = state
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(spec.name.clone())
            .or_insert_with(|| MemoryCollection {
                partition_key: spec.partition_key.clone(),
                records: Vec::new(),
            });
        collection.records.push(record);
    }

    /// Makes every subsequent store call fail with `failure` until cleared.
    pub async fn set_failure(&self, failure: Option<StoreError>) {
        self.state.write().await.failure = failure;
    }

    /// Removes a collection and its records.
    pub async fn drop_collection(&self, database: &str, name: &str) {
        if let Some(collections) = self.state.write().await.databases.get_mut(database) {
            collections.remove(name);
        }
    }

    pub async fn collection_exists(&self, database: &str, name: &str) -> bool {
        self.state
            .read()
            .await
            .databases
            .get(database)
            .is_some_and(|collections| collections.contains_key(name))
    }

    /// Names of the collections queried so far, in call order.
    pub async fn query_log(&self) -> Vec<String> {
        self.state.read().await.query_log.clone()
    }

    async fn check_failure(&self) -> Result<(), StoreError> {
        match &self.state.read().await.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

fn field_equals(record: &Record, field: &str, value: &str) -> bool {
    matches!(record.get(field), Some(Value::String(v)) if v == value)
}

fn missing_collection(handle: &CollectionHandle) -> StoreError {
    StoreError::ResourceNotFound {
        kind: ResourceKind::Collection,
        name: handle.name().to_string(),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_or_create_database(&self, name: &str) -> Result<DatabaseHandle, StoreError> {
        self.check_failure().await?;

        let mut state = self.state.write().await;
        if !state.databases.contains_key(name) {
            tracing::info!(database = %name, "Creating database");
            state.databases.insert(name.to_string(), HashMap::new());
        }
        Ok(DatabaseHandle::new(name))
    }

    async fn get_or_create_collection(
        &self,
        database: &DatabaseHandle,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle, StoreError> {
        self.check_failure().await?;

        let mut state = self.state.write().await;
        let collections = state.databases.get_mut(database.name()).ok_or_else(|| {
            StoreError::ResourceNotFound {
                kind: ResourceKind::Database,
                name: database.name().to_string(),
            }
        })?;

        if !collections.contains_key(&spec.name) {
            tracing::info!(
                collection = %spec.name,
                partition_key = %spec.partition_key,
                "Creating collection"
            );
            collections.insert(
                spec.name.clone(),
                MemoryCollection {
                    partition_key: spec.partition_key.clone(),
                    records: Vec::new(),
                },
            );
        }

        Ok(CollectionHandle::new(database, spec))
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        query: &RecordQuery,
    ) -> Result<QueryResponse, StoreError> {
        self.check_failure().await?;

        let mut state = self.state.write().await;
        state.query_log.push(collection.name().to_string());

        let stored = state
            .databases
            .get(collection.database())
            .and_then(|collections| collections.get(collection.name()))
            .ok_or_else(|| missing_collection(collection))?;

        let limit = query
            .limit
            .map(|l| l.max(0) as usize)
            .unwrap_or(usize::MAX);

        let records = stored
            .records
            .iter()
            .filter(|record| field_equals(record, &query.field, &query.value))
            .take(limit)
            .cloned()
            .collect();

        Ok(QueryResponse {
            records,
            request_charge: state.request_charge,
        })
    }

    async fn read_by_id(
        &self,
        collection: &CollectionHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<PointRead>, StoreError> {
        self.check_failure().await?;

        let state = self.state.read().await;
        let stored = state
            .databases
            .get(collection.database())
            .and_then(|collections| collections.get(collection.name()))
            .ok_or_else(|| missing_collection(collection))?;

        let record = stored
            .records
            .iter()
            .find(|record| {
                field_equals(record, "id", id)
                    && field_equals(record, &stored.partition_key, partition_key)
            })
            .cloned();

        Ok(record.map(|record| PointRead {
            record,
            request_charge: state.request_charge,
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_failure().await
    }
}
