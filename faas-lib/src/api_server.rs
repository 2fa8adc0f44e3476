//! Axum HTTP surface: the concrete ingress transport, exposing an
//! `ApiState`/`create_app(state) -> Router` pair served with `axum::serve`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use faas_core::PoolHandle;
use faas_orchestrator::Orchestrator;
use tracing::info;

use crate::api_routes::{healthz_handler, metrics_pool_handler, submit_activation_handler};

#[derive(Clone, Debug)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("FAAS_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("FAAS_API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub pool: PoolHandle,
}

pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .route("/activations", post(submit_activation_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics/pool", get(metrics_pool_handler))
        .with_state(state)
}

pub async fn serve(config: ApiServerConfig, state: ApiState) -> std::io::Result<()> {
    let app = create_app(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid FAAS_API_HOST/FAAS_API_PORT");

    info!(%addr, "invoker API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
