use crate::config::DataApiConfig;
use crate::handlers;
use crate::services::{provision_with_retry, DocumentStore, MongoStore, RecordService};
use axum::{
    http::{header, HeaderName, Method, Request},
    middleware::from_fn,
    routing::get,
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware, tracing::REQUEST_ID_HEADER,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: DataApiConfig,
    pub records: RecordService,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/customer/:id", get(handlers::customer_by_id))
        .route("/policy/:id", get(handlers::policy_by_id))
        .route("/agent/:id", get(handlers::agent_by_id))
        .route("/options/:id", get(handlers::options_by_id))
        .route("/api/:customerid", get(handlers::get_composite))
        .route(
            "/api",
            get(handlers::legacy_api).post(handlers::legacy_api),
        )
        .route("/records/:collection/:id", get(handlers::read_record))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    HeaderName::from_static(REQUEST_ID_HEADER),
                ]),
        )
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    /// Connects to the configured document store and builds the server.
    pub async fn build(config: DataApiConfig) -> Result<Self, AppError> {
        let store = MongoStore::connect(&config.store, &config.service_name)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to document store: {}", e);
                AppError::InternalError(anyhow::anyhow!("document store connection failed: {}", e))
            })?;

        Self::build_with_store(config, Arc::new(store)).await
    }

    /// Builds the server on top of an already constructed store.
    pub async fn build_with_store(
        config: DataApiConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, AppError> {
        let catalog = provision_with_retry(
            store.as_ref(),
            &config.store.database,
            config.store.startup_timeout,
        )
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to provision database {}: {}",
                config.store.database,
                e
            );
            AppError::InternalError(anyhow::anyhow!("document store provisioning failed: {}", e))
        })?;

        let state = AppState {
            config: config.clone(),
            records: RecordService::new(store, catalog),
        };

        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
