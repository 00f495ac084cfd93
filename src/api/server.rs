//! API Server

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::{config::ApiConfig, errors::{ConfigurationError, TuplausResult}};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Router with the full middleware stack
pub fn create_app(state: Arc<AppState>, config: &ApiConfig) -> axum::Router {
    create_router(state, config.enable_debug_routes)
        // Request ID first so every later layer sees it
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS before timeout to handle preflight
        .layer(create_cors_layer(config.allowed_origins.clone()))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> TuplausResult<()> {
        let addr = self.socket_addr()?;
        let app = create_app(self.state.clone(), &self.config);

        self.log_server_info(addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Tuplaus API listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    fn socket_addr(&self) -> TuplausResult<SocketAddr> {
        let ip = self.config.host.parse::<std::net::IpAddr>().map_err(|e| ConfigurationError::InvalidValue {
            field: "api.host".to_string(),
            value: self.config.host.clone(),
            reason: e.to_string(),
        })?;
        Ok(SocketAddr::from((ip, self.config.port)))
    }

    fn log_server_info(&self, addr: SocketAddr) {
        info!("Server configuration:");
        info!("   Listen: {}", addr);
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!("   Metrics enabled: {}", self.state.metrics.is_some());
        info!("Available endpoints:");
        info!("   POST /api/tuplaus   - Settle one play");
        info!("   GET  /health        - Health check");
        info!("   GET  /metrics       - Prometheus metrics");
        if self.config.enable_debug_routes {
            warn!("Debug routes enabled: /api/debug/addPlayer, /api/debug/everything, /api/debug/reconcile/:id");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
