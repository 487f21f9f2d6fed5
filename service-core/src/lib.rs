//! service-core: Shared infrastructure for the data-api workspace.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
