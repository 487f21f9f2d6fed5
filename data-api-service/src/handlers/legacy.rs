//! Single-endpoint form of the composite lookup, kept for existing callers.
//!
//! The customer id comes from the `customerid` query parameter, or failing
//! that from a `customerid` field in a JSON body. Unknown or missing ids get
//! a plain-text hint instead of a JSON error.

use crate::error::DataApiError;
use crate::services::assemble;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

pub const LEGACY_HINT: &str = "Customerid is not provided or it is not found in ingested data. Try this ?customerid=LA-SG_21104577";

#[derive(Debug, Default, Deserialize)]
pub struct LegacyParams {
    pub customerid: Option<String>,
}

fn customer_id_from(params: LegacyParams, body: &[u8]) -> Option<String> {
    let non_empty = |id: String| (!id.trim().is_empty()).then_some(id);

    params.customerid.and_then(non_empty).or_else(|| {
        let body: Value = serde_json::from_slice(body).ok()?;
        body.get("customerid")?
            .as_str()
            .map(str::to_string)
            .and_then(non_empty)
    })
}

fn hint() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        LEGACY_HINT,
    )
        .into_response()
}

pub async fn legacy_api(
    State(state): State<AppState>,
    params: Option<Query<LegacyParams>>,
    body: Bytes,
) -> Response {
    // An unparseable query string is treated like a missing one.
    let params = params.map(|Query(params)| params).unwrap_or_default();
    let Some(customer_id) = customer_id_from(params, &body) else {
        tracing::info!("Legacy request without customer id");
        return hint();
    };

    match assemble(&state.records, &customer_id).await {
        Ok(composite) => Json(composite).into_response(),
        Err(DataApiError::DependentLookupEmpty { .. } | DataApiError::MissingIdentifier) => hint(),
        Err(e) => e.into_response(),
    }
}
