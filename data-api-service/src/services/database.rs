//! MongoDB wire-protocol implementation of `DocumentStore`.
//!
//! Works against MongoDB and against Cosmos DB's API for MongoDB. Collection
//! handles are resolved once during provisioning and cached; queries against a
//! collection that was never provisioned fail with `ResourceNotFound`.

use super::store::{
    CollectionHandle, DatabaseHandle, DocumentStore, PointRead, QueryResponse, RecordQuery,
};
use crate::config::StoreConfig;
use crate::error::{ResourceKind, StoreError};
use crate::models::{CollectionSpec, Record};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::ErrorKind,
    options::{ClientOptions, FindOptions, IndexOptions, ServerAddress},
    Client as MongoClient, Collection, Database, IndexModel,
};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cosmos DB answers throttled requests with this code.
const TOO_MANY_REQUESTS: i32 = 16500;
const NAMESPACE_NOT_FOUND: i32 = 26;
const NAMESPACE_EXISTS: i32 = 48;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Command(cmd) if cmd.code == TOO_MANY_REQUESTS => StoreError::Throttled {
                retry_after: parse_retry_after(&cmd.message),
            },
            _ => StoreError::unavailable(err.to_string()),
        }
    }
}

fn command_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => Some(cmd.code),
        _ => None,
    }
}

/// Extracts `RetryAfterMs=<n>` from a Cosmos DB throttling message.
fn parse_retry_after(message: &str) -> Option<Duration> {
    let (_, rest) = message.split_once("RetryAfterMs=")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().map(Duration::from_millis)
}

/// Cosmos DB account name: first label of the first host.
fn account_name(hosts: &[ServerAddress]) -> Option<String> {
    hosts.iter().find_map(|host| match host {
        ServerAddress::Tcp { host, .. } => host.split('.').next().map(str::to_string),
        _ => None,
    })
}

/// Converts a BSON document into an API record, dropping the store-internal `_id`.
fn into_record(collection: &str, mut document: Document) -> Result<Record, StoreError> {
    document.remove("_id");
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::MalformedRecord {
            collection: collection.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    collections: Arc<RwLock<HashMap<CollectionHandle, Collection<Document>>>>,
    report_request_charge: bool,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig, app_name: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.endpoint).await.map_err(|e| {
            tracing::error!("Failed to parse store endpoint: {}", e);
            StoreError::from(e)
        })?;

        options.app_name = Some(app_name.to_string());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        let mut credential = options.credential.take().unwrap_or_default();
        if credential.username.is_none() {
            credential.username = account_name(&options.hosts);
        }
        credential.password = Some(config.key.expose_secret().clone());
        options.credential = Some(credential);

        let hosts: Vec<String> = options.hosts.iter().map(|h| h.to_string()).collect();
        tracing::info!(hosts = ?hosts, "Connecting to document store");

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create document store client: {}", e);
            StoreError::from(e)
        })?;

        Ok(Self {
            client,
            collections: Arc::new(RwLock::new(HashMap::new())),
            report_request_charge: config.report_request_charge,
        })
    }

    async fn collection(
        &self,
        handle: &CollectionHandle,
    ) -> Result<Collection<Document>, StoreError> {
        self.collections
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| StoreError::ResourceNotFound {
                kind: ResourceKind::Collection,
                name: handle.name().to_string(),
            })
    }

    /// Forgets a cached handle, e.g. after the server reported the namespace gone.
    async fn evict(&self, handle: &CollectionHandle) {
        self.collections.write().await.remove(handle);
    }

    async fn ensure_indexes(
        &self,
        collection: &Collection<Document>,
        spec: &CollectionSpec,
    ) -> Result<(), StoreError> {
        let mut partition_keys = Document::new();
        partition_keys.insert(spec.partition_key.as_str(), 1);
        let partition_index = IndexModel::builder()
            .keys(partition_keys)
            .options(
                IndexOptions::builder()
                    .name(format!("{}_partition", spec.name))
                    .build(),
            )
            .build();

        collection
            .create_index(partition_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create partition index on {} collection: {}",
                    spec.name,
                    e
                );
                StoreError::from(e)
            })?;

        if spec.partition_key != "id" {
            let mut point_read_keys = doc! { "id": 1 };
            point_read_keys.insert(spec.partition_key.as_str(), 1);
            let point_read_index = IndexModel::builder()
                .keys(point_read_keys)
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_point_read", spec.name))
                        .build(),
                )
                .build();

            collection
                .create_index(point_read_index, None)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to create point read index on {} collection: {}",
                        spec.name,
                        e
                    );
                    StoreError::from(e)
                })?;
        }

        tracing::info!(collection = %spec.name, "Ensured collection indexes");
        Ok(())
    }

    /// Asks Cosmos DB what the previous operation cost. Plain MongoDB does not
    /// know the command, in which case no charge is reported.
    ///
    /// The statistics command is a separate round trip checked out from the
    /// connection pool. Cosmos DB reports per connection, so under concurrent
    /// load the command can land on a different connection than the read it
    /// follows and return that connection's last charge instead. Treat the
    /// value as an approximation.
    async fn last_request_charge(&self, database: &Database) -> Option<f64> {
        if !self.report_request_charge {
            return None;
        }

        match database
            .run_command(doc! { "getLastRequestStatistics": 1 }, None)
            .await
        {
            Ok(stats) => match stats.get("RequestCharge") {
                Some(Bson::Double(v)) => Some(*v),
                Some(Bson::Int32(v)) => Some(f64::from(*v)),
                Some(Bson::Int64(v)) => Some(*v as f64),
                _ => None,
            },
            Err(e) => {
                tracing::debug!(error = %e, "Request statistics unavailable");
                None
            }
        }
    }

    fn map_query_error(handle: &CollectionHandle, err: mongodb::error::Error) -> StoreError {
        if command_code(&err) == Some(NAMESPACE_NOT_FOUND) {
            StoreError::ResourceNotFound {
                kind: ResourceKind::Collection,
                name: handle.name().to_string(),
            }
        } else {
            StoreError::from(err)
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get_or_create_database(&self, name: &str) -> Result<DatabaseHandle, StoreError> {
        let existing = self
            .client
            .list_database_names(doc! { "name": name }, None)
            .await?;

        if existing.is_empty() {
            // MongoDB materializes a database with its first collection.
            tracing::info!(database = %name, "Creating database");
        }

        Ok(DatabaseHandle::new(name))
    }

    async fn get_or_create_collection(
        &self,
        database: &DatabaseHandle,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle, StoreError> {
        let db = self.client.database(database.name());
        let existing = db
            .list_collection_names(doc! { "name": spec.name.as_str() })
            .await?;

        if existing.is_empty() {
            tracing::info!(
                collection = %spec.name,
                partition_key = %spec.partition_key,
                "Creating collection"
            );
            match db.create_collection(&spec.name, None).await {
                Ok(()) => {}
                // Another instance created it between our check and create.
                Err(e) if command_code(&e) == Some(NAMESPACE_EXISTS) => {}
                Err(e) => {
                    tracing::error!("Failed to create collection {}: {}", spec.name, e);
                    return Err(e.into());
                }
            }
        }

        let collection = db.collection::<Document>(&spec.name);
        self.ensure_indexes(&collection, spec).await?;

        let handle = CollectionHandle::new(database, spec);
        self.collections
            .write()
            .await
            .insert(handle.clone(), collection);
        Ok(handle)
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        query: &RecordQuery,
    ) -> Result<QueryResponse, StoreError> {
        let target = self.collection(collection).await?;

        let mut filter = Document::new();
        filter.insert(query.field.as_str(), query.value.as_str());
        let options = FindOptions::builder().limit(query.limit).build();

        let result: Result<Vec<Document>, mongodb::error::Error> = async {
            let cursor = target.find(filter, options).await?;
            cursor.try_collect().await
        }
        .await;

        let documents = match result {
            Ok(documents) => documents,
            Err(e) => {
                let err = Self::map_query_error(collection, e);
                if matches!(err, StoreError::ResourceNotFound { .. }) {
                    self.evict(collection).await;
                }
                return Err(err);
            }
        };

        let records = documents
            .into_iter()
            .map(|d| into_record(collection.name(), d))
            .collect::<Result<Vec<_>, _>>()?;

        let database = self.client.database(collection.database());
        Ok(QueryResponse {
            records,
            request_charge: self.last_request_charge(&database).await,
        })
    }

    async fn read_by_id(
        &self,
        collection: &CollectionHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<PointRead>, StoreError> {
        let target = self.collection(collection).await?;

        if collection.partition_key() == "id" && partition_key != id {
            return Ok(None);
        }

        let mut filter = doc! { "id": id };
        filter.insert(collection.partition_key(), partition_key);

        let found = target
            .find_one(filter, None)
            .await
            .map_err(|e| Self::map_query_error(collection, e))?;

        let database = self.client.database(collection.database());
        match found {
            Some(document) => Ok(Some(PointRead {
                record: into_record(collection.name(), document)?,
                request_charge: self.last_request_charge(&database).await,
            })),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("Document store health check failed: {}", e);
                StoreError::from(e)
            })?;
        Ok(())
    }
}
