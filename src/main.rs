use axum::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tenant_gateway::{
    AppState,
    config::Config,
    connectors::ConnectorRegistry,
    db::create_pool,
    gateway::TenantGateway,
    init_tracing,
    routes::create_router,
    store::PgCredentialStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config.logging());

    let pool = create_pool(&config.database())?;
    let store = Arc::new(PgCredentialStore::new(pool));
    let gateway = TenantGateway::new(store, config.gateway());
    let connectors = ConnectorRegistry::from_config(&config.connectors())?;

    let addr: SocketAddr = config.server_address().parse()?;
    let state = Arc::new(AppState::new(gateway, connectors, config));
    let app = create_router(state);

    tracing::info!(address = %addr, "Tenant credential gateway listening");
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
