use crate::catalog::CatalogClient;
use crate::config::{Config, GenreTable};
use crate::error::CatalogError;
use crate::recommend::{ProfileStore, RecommendationEngine};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod routes_api;
pub mod routes_stream;

/// Shared application context
///
/// Process-wide collaborators are constructed once at startup and injected
/// here; sessions only ever share the pooled catalog client and read-only
/// configuration.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogClient>,
    pub engine: Arc<RecommendationEngine>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppContext {
    pub fn new(config: Config, profiles: Arc<dyn ProfileStore>) -> Self {
        let genres = Arc::new(GenreTable::from_entries(&config.catalog.genres));
        let catalog = Arc::new(CatalogClient::new(&config.catalog, genres));
        let engine = Arc::new(RecommendationEngine::new(catalog.clone(), &config.recommend));
        Self {
            config: Arc::new(config),
            catalog,
            engine,
            profiles,
        }
    }
}

/// Error envelope returned by API handlers.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self {
            status: StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            routes_api::api_routes().merge(routes_stream::stream_routes()),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config, profiles: Arc<dyn ProfileStore>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config, profiles);
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
