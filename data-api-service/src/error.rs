//! Error taxonomy for store access and record assembly.
//!
//! `StoreError` describes what went wrong talking to the document store;
//! `DataApiError` adds the request-level conditions. Both convert into
//! `service_core::error::AppError` at the HTTP boundary.

use axum::response::{IntoResponse, Response};
use service_core::error::AppError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Database,
    Collection,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Database => write!(f, "database"),
            ResourceKind::Collection => write!(f, "collection"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transport, authentication or server failure. Carries the provider message.
    #[error("document store unavailable: {message}")]
    Unavailable { message: String },

    #[error("document store throttled the request")]
    Throttled { retry_after: Option<Duration> },

    #[error("{kind} '{name}' does not exist")]
    ResourceNotFound { kind: ResourceKind, name: String },

    #[error("malformed {collection} record: {reason}")]
    MalformedRecord { collection: String, reason: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable { .. } | StoreError::Throttled { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum DataApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no policy found for customer '{customer_id}'; agent and options lookups are unavailable")]
    DependentLookupEmpty { customer_id: String },

    #[error("customer id must not be empty")]
    MissingIdentifier,

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("no {collection} record with id '{id}'")]
    RecordNotFound { collection: String, id: String },
}

impl From<DataApiError> for AppError {
    fn from(err: DataApiError) -> Self {
        match err {
            DataApiError::Store(StoreError::Unavailable { message }) => {
                tracing::error!(error = %message, "Document store unavailable");
                AppError::ServiceUnavailable("document store unavailable".to_string())
            }
            DataApiError::Store(StoreError::Throttled { retry_after }) => {
                // Retry-After is whole seconds; never advertise zero.
                let secs = retry_after.map(|d| d.as_millis().div_ceil(1000).max(1) as u64);
                AppError::TooManyRequests(
                    "document store is throttling requests, retry later".to_string(),
                    secs,
                )
            }
            DataApiError::Store(err @ StoreError::ResourceNotFound { .. }) => {
                tracing::error!(error = %err, "Store resource missing after provisioning");
                AppError::ServiceUnavailable("document store unavailable".to_string())
            }
            DataApiError::Store(StoreError::MalformedRecord { collection, reason }) => {
                AppError::BadGateway(format!("malformed {} record: {}", collection, reason))
            }
            err @ DataApiError::DependentLookupEmpty { .. } => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            err @ DataApiError::MissingIdentifier => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            err @ DataApiError::UnknownCollection(_) => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            err @ DataApiError::RecordNotFound { .. } => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
        }
    }
}

impl IntoResponse for DataApiError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
