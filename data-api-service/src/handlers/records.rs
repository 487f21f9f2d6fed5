use crate::error::DataApiError;
use crate::models::{CollectionKind, CollectionRecords, Record};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

pub async fn customer_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionRecords>, DataApiError> {
    lookup(&state, CollectionKind::Customer, &id).await
}

pub async fn policy_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionRecords>, DataApiError> {
    lookup(&state, CollectionKind::Policy, &id).await
}

pub async fn agent_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionRecords>, DataApiError> {
    lookup(&state, CollectionKind::Agent, &id).await
}

pub async fn options_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionRecords>, DataApiError> {
    lookup(&state, CollectionKind::Options, &id).await
}

async fn lookup(
    state: &AppState,
    kind: CollectionKind,
    id: &str,
) -> Result<Json<CollectionRecords>, DataApiError> {
    let records = state.records.lookup_by_id(kind, id).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct PointReadParams {
    pub partition_key: Option<String>,
}

/// Point read by id within one partition.
pub async fn read_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Query(params): Query<PointReadParams>,
) -> Result<Json<Record>, DataApiError> {
    let kind: CollectionKind = collection
        .parse()
        .map_err(|_| DataApiError::UnknownCollection(collection.clone()))?;

    let record = state
        .records
        .read_record(kind, &id, params.partition_key.as_deref())
        .await?;
    Ok(Json(record))
}
