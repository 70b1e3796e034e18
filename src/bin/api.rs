use safe_sentinel_console::{
    api::{start_server, ApiState},
    EngineConfig, HttpGateway, ServerConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let engine = EngineConfig::from_env()?;
    let server = ServerConfig::from_env()?;

    info!("SafeSentinel Console - API Server");
    info!("Engine: {}", engine.base_url);
    info!("Port: {}", server.port);

    let gateway = Arc::new(HttpGateway::new(&engine)?);
    let state = ApiState::new(gateway);

    info!("Starting API server...");

    start_server(state, server.port).await?;

    Ok(())
}
