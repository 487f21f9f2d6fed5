//! Document store abstraction.
//!
//! The API only needs four operations from the store: make sure a database
//! and its collections exist, run an equality query, and do a point read.
//! Every read reports the provider's request charge when it has one.

use crate::error::StoreError;
use crate::models::{CollectionSpec, Record};
use async_trait::async_trait;
use std::fmt;

/// Handle to a database that is known to exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseHandle {
    name: String,
}

impl DatabaseHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle to a provisioned collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionHandle {
    database: String,
    name: String,
    partition_key: String,
}

impl CollectionHandle {
    pub fn new(database: &DatabaseHandle, spec: &CollectionSpec) -> Self {
        Self {
            database: database.name().to_string(),
            name: spec.name.clone(),
            partition_key: spec.partition_key.clone(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }
}

/// Equality predicate on a single top-level attribute, optionally capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub field: String,
    pub value: String,
    pub limit: Option<i64>,
}

impl RecordQuery {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            limit: None,
        }
    }

    pub fn top(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl fmt::Display for RecordQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "top {} where {} = '{}'", limit, self.field, self.value),
            None => write!(f, "where {} = '{}'", self.field, self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub records: Vec<Record>,
    /// Provider-reported cost, when the backend reports one.
    pub request_charge: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointRead {
    pub record: Record,
    pub request_charge: Option<f64>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns a handle to `name`, creating the database if it is absent.
    async fn get_or_create_database(&self, name: &str) -> Result<DatabaseHandle, StoreError>;

    /// Returns a handle to the collection, creating it if it is absent.
    async fn get_or_create_collection(
        &self,
        database: &DatabaseHandle,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle, StoreError>;

    /// Runs a cross-partition equality query. Fails with
    /// `StoreError::ResourceNotFound` when the collection is gone.
    async fn query(
        &self,
        collection: &CollectionHandle,
        query: &RecordQuery,
    ) -> Result<QueryResponse, StoreError>;

    /// Point read by `id` within one partition.
    async fn read_by_id(
        &self,
        collection: &CollectionHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<PointRead>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
