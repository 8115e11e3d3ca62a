//! Cartera API server
//!
//! Axum router over a loaded portfolio.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::config::DashboardConfig;
use crate::excel::ExcelImporter;
use crate::logging;
use crate::types::Portfolio;

/// API Server configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Overrides the config's workbook path
    pub workbook: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workbook: None,
            config: None,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub portfolio: Portfolio,
    pub config: DashboardConfig,
}

impl AppState {
    pub fn new(portfolio: Portfolio, config: DashboardConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            portfolio,
            config,
        }
    }
}

/// Build the router. Separate from [`run_api_server`] so tests can drive it
/// without a socket.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Dashboard endpoints
        .route("/api/v1/options", get(handlers::options))
        .route("/api/v1/view", post(handlers::view))
        .route("/api/v1/chart/scatter", post(handlers::scatter))
        .route("/api/v1/chart/bars", post(handlers::bars))
        .route("/api/v1/export/csv", post(handlers::export_csv))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Load the workbook and serve until SIGINT/SIGTERM
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    logging::init(logging::SERVER_DEFAULT_FILTER);

    let dashboard = DashboardConfig::load_or_default(config.config.as_deref())?;
    let workbook = config.workbook.clone().unwrap_or_else(|| dashboard.workbook.clone());
    let portfolio = ExcelImporter::new(&workbook)
        .with_sheet_names(dashboard.sheets.clone())
        .import()?;
    info!(
        workbook = %workbook.display(),
        rows = portfolio.total_records(),
        "portfolio loaded"
    );

    let state = Arc::new(AppState::new(portfolio, dashboard));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Cartera API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/options, /api/v1/view, /api/v1/chart/scatter, /api/v1/chart/bars, /api/v1/export/csv");
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Cartera API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    info!("Shutdown signal received, stopping server...");
}
