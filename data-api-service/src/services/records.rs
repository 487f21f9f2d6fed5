use super::catalog::Catalog;
use super::metrics::{record_request_charge, record_store_query};
use super::store::{DocumentStore, RecordQuery};
use crate::error::{DataApiError, StoreError};
use crate::models::{CollectionKind, CollectionRecords, Record};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Read access to the provisioned collections.
///
/// Every store call is logged with its request charge. A collection that
/// disappeared after startup is provisioned again and the call retried once.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<Catalog>,
}

impl RecordService {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: Catalog) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub async fn query(
        &self,
        kind: CollectionKind,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, StoreError> {
        self.with_reprovision(kind, || self.query_once(kind, query))
            .await
    }

    /// Single-collection lookup on `id`. No match is an empty result, not an error.
    pub async fn lookup_by_id(
        &self,
        kind: CollectionKind,
        id: &str,
    ) -> Result<CollectionRecords, DataApiError> {
        tracing::info!(collection = %kind, id = %id, "Build api response for id");

        let records = self.query(kind, &RecordQuery::eq("id", id)).await?;
        Ok(CollectionRecords {
            collection: kind,
            records,
        })
    }

    /// Point read by `id` and partition-key value. Without an explicit
    /// partition key the id doubles as one.
    pub async fn read_record(
        &self,
        kind: CollectionKind,
        id: &str,
        partition_key: Option<&str>,
    ) -> Result<Record, DataApiError> {
        let partition_key = partition_key.unwrap_or(id);

        let found = self
            .with_reprovision(kind, || async move {
                let started = Instant::now();
                let result = self
                    .store
                    .read_by_id(self.catalog.handle(kind), id, partition_key)
                    .await;
                self.observe(kind, started, &result, |read| {
                    (usize::from(read.is_some()), read.as_ref().and_then(|r| r.request_charge))
                });
                result
            })
            .await?;

        match found {
            Some(read) => {
                tracing::info!(
                    collection = %kind,
                    id = %id,
                    request_charge = ?read.request_charge,
                    "Read item with id {}",
                    id
                );
                Ok(read.record)
            }
            None => Err(DataApiError::RecordNotFound {
                collection: kind.name().to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn query_once(
        &self,
        kind: CollectionKind,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let started = Instant::now();
        let result = self.store.query(self.catalog.handle(kind), query).await;
        self.observe(kind, started, &result, |response| {
            (response.records.len(), response.request_charge)
        });

        if let Ok(response) = &result {
            tracing::info!(
                collection = %kind,
                query = %query,
                rows = response.records.len(),
                request_charge = ?response.request_charge,
                "Query returned {} items",
                response.records.len()
            );
        }

        result.map(|response| response.records)
    }

    fn observe<T>(
        &self,
        kind: CollectionKind,
        started: Instant,
        result: &Result<T, StoreError>,
        summary: impl FnOnce(&T) -> (usize, Option<f64>),
    ) {
        let elapsed = started.elapsed();
        match result {
            Ok(value) => {
                let (rows, charge) = summary(value);
                record_store_query(kind.name(), "ok", elapsed);
                if let Some(charge) = charge {
                    record_request_charge(kind.name(), charge);
                }
                tracing::debug!(
                    collection = %kind,
                    rows,
                    duration_ms = elapsed.as_millis() as u64,
                    "Store call completed"
                );
            }
            Err(e) => {
                record_store_query(kind.name(), "error", elapsed);
                tracing::warn!(
                    collection = %kind,
                    error = %e,
                    duration_ms = elapsed.as_millis() as u64,
                    "Store call failed"
                );
            }
        }
    }

    async fn with_reprovision<T, F, Fut>(&self, kind: CollectionKind, op: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match op().await {
            Err(StoreError::ResourceNotFound { kind: missing, name }) => {
                tracing::warn!(
                    collection = %kind,
                    missing = %missing,
                    name = %name,
                    "Store resource missing, provisioning and retrying once"
                );
                self.store
                    .get_or_create_collection(self.catalog.database(), &kind.spec())
                    .await?;
                op().await
            }
            other => other,
        }
    }
}
