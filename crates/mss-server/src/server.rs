use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use mss_db_memory::InMemoryStorage;
use mss_db_postgres::PostgresStorage;
use mss_storage::{DynRepository, StorageError};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{AppConfig, StorageBackend},
    handlers,
    initclient::InitService,
    middleware::{self as app_middleware, RequestId},
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repo: DynRepository,
    pub init: InitService,
}

impl AppState {
    pub fn new(repo: DynRepository, storage_timeout: Duration) -> Self {
        Self {
            init: InitService::new(repo.clone(), storage_timeout),
            repo,
        }
    }
}

pub struct MssServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/api/init", post(handlers::init_client_app))
        .with_state(state)
        // Layers run bottom-up: request id is assigned before the trace span opens
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .map(|id| id.as_str().to_string())
                        .unwrap_or_default();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// Opens the repository selected by `cfg.storage.backend` and binds the
/// configured apps.
pub async fn create_repository(cfg: &AppConfig) -> Result<DynRepository, StorageError> {
    let apps = &cfg.storage.bound_apps;
    match cfg.storage.backend {
        StorageBackend::Memory => {
            let storage = InMemoryStorage::new();
            for app in apps {
                storage.bind_app(&app.app_id, &app.app_name);
            }
            let repo: DynRepository = Arc::new(storage);
            Ok(repo)
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .ok_or_else(|| StorageError::internal("storage.postgres is not configured"))?;
            let storage = PostgresStorage::new(pg.to_postgres_config()).await?;
            for app in apps {
                storage.bind_app(&app.app_id, &app.app_name).await?;
            }
            let repo: DynRepository = Arc::new(storage);
            Ok(repo)
        }
    }
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    repo: Option<DynRepository>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            repo: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses `repo` instead of opening the configured backend.
    pub fn with_repository(mut self, repo: DynRepository) -> Self {
        self.repo = Some(repo);
        self
    }

    pub async fn build(self) -> Result<MssServer, StorageError> {
        let repo = match self.repo {
            Some(repo) => repo,
            None => create_repository(&self.config).await?,
        };
        tracing::info!(
            backend = repo.backend_name(),
            storage_timeout_ms = self.config.init.storage_timeout_ms,
            "storage ready"
        );

        let state = AppState::new(repo, self.config.storage_timeout());
        let app = build_app(&self.config, state);

        Ok(MssServer {
            addr: self.addr,
            app,
        })
    }
}

impl MssServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
