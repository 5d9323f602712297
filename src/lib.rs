pub mod config;
pub mod connectors;
pub mod db;
pub mod error;
pub mod gateway;
pub mod knowledge;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod store;
pub mod validation;

use crate::config::{Config, LoggingConfig};
use crate::connectors::ConnectorRegistry;
use crate::gateway::TenantGateway;
use crate::knowledge::KnowledgeIndex;
use crate::middleware::auth::JwtService;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub gateway: TenantGateway,
    pub connectors: ConnectorRegistry,
    pub knowledge: Arc<KnowledgeIndex>,
    pub jwt: JwtService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(gateway: TenantGateway, connectors: ConnectorRegistry, config: Config) -> Self {
        let jwt = JwtService::new(config.jwt_secret.clone());
        Self {
            gateway,
            connectors,
            knowledge: Arc::new(KnowledgeIndex::new()),
            jwt,
            config: Arc::new(config),
        }
    }
}

pub fn init_tracing(config: &LoggingConfig) {
    let level_filter = match config.level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_filter));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
