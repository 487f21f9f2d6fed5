use secrecy::Secret;
use service_core::config::{self as core_config, optional, parse_or, require};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DataApiConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreConfig,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection string of the document store (`mongodb://` or `mongodb+srv://`).
    pub endpoint: String,
    pub key: Secret<String>,
    pub database: String,
    /// Ask the store for per-operation request charges (Cosmos DB only).
    pub report_request_charge: bool,
    pub connect_timeout: Duration,
    /// Upper bound on retrying provisioning while the store is unreachable.
    pub startup_timeout: Duration,
}

impl DataApiConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Builds the service configuration from `lookup`, which resolves
    /// variable names to values.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig {
            endpoint: require(&lookup, "STORE_ENDPOINT")?,
            key: Secret::new(require(&lookup, "STORE_KEY")?),
            database: require(&lookup, "STORE_DATABASE")?,
            report_request_charge: parse_or(&lookup, "STORE_REQUEST_CHARGE", false)?,
            connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STORE_CONNECT_TIMEOUT_SECS",
                10,
            )?),
            startup_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STORE_STARTUP_TIMEOUT_SECS",
                60,
            )?),
        };

        if !store.endpoint.starts_with("mongodb://") && !store.endpoint.starts_with("mongodb+srv://")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "STORE_ENDPOINT must start with mongodb:// or mongodb+srv://"
            )));
        }

        Ok(DataApiConfig {
            common,
            service_name: optional(&lookup, "SERVICE_NAME")
                .unwrap_or_else(|| "data-api-service".to_string()),
            log_level: optional(&lookup, "LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            otlp_endpoint: optional(&lookup, "OTLP_ENDPOINT"),
            store,
        })
    }
}
