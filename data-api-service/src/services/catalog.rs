//! One-time provisioning of the database and the four collections.

use super::store::{CollectionHandle, DatabaseHandle, DocumentStore};
use crate::error::StoreError;
use crate::models::CollectionKind;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::time::Duration;

/// Cached handles for every collection the API reads.
#[derive(Debug, Clone)]
pub struct Catalog {
    database: DatabaseHandle,
    customer: CollectionHandle,
    policy: CollectionHandle,
    agent: CollectionHandle,
    options: CollectionHandle,
}

impl Catalog {
    pub fn database(&self) -> &DatabaseHandle {
        &self.database
    }

    pub fn handle(&self, kind: CollectionKind) -> &CollectionHandle {
        match kind {
            CollectionKind::Customer => &self.customer,
            CollectionKind::Policy => &self.policy,
            CollectionKind::Agent => &self.agent,
            CollectionKind::Options => &self.options,
        }
    }
}

/// Gets or creates the database and every collection.
pub async fn provision(store: &dyn DocumentStore, database: &str) -> Result<Catalog, StoreError> {
    let database = store.get_or_create_database(database).await?;

    let customer = store
        .get_or_create_collection(&database, &CollectionKind::Customer.spec())
        .await?;
    let policy = store
        .get_or_create_collection(&database, &CollectionKind::Policy.spec())
        .await?;
    let agent = store
        .get_or_create_collection(&database, &CollectionKind::Agent.spec())
        .await?;
    let options = store
        .get_or_create_collection(&database, &CollectionKind::Options.spec())
        .await?;

    tracing::info!(database = %database.name(), "Provisioned collections");

    Ok(Catalog {
        database,
        customer,
        policy,
        agent,
        options,
    })
}

/// Like [`provision`], retrying transient store failures with exponential
/// backoff for at most `max_elapsed`.
pub async fn provision_with_retry(
    store: &dyn DocumentStore,
    database: &str,
    max_elapsed: Duration,
) -> Result<Catalog, StoreError> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..Default::default()
    };

    retry(backoff, || async move {
        provision(store, database).await.map_err(|e| {
            if e.is_transient() {
                tracing::warn!(error = %e, "Provisioning failed, retrying");
                backoff::Error::transient(e)
            } else {
                backoff::Error::permanent(e)
            }
        })
    })
    .await
}
