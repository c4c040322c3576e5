use std::net::SocketAddr;
use std::sync::Arc;

use files_api::llm::OpenAIGenerator;
use files_api::utils::init_logger;
use files_api::{config::Config, routes::create_router, storage, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let store = storage::from_config(&config.storage)?;

    if config.llm.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; file generation requests will fail");
    }
    let generator = Arc::new(OpenAIGenerator::new(&config.llm));

    // Create shared state
    let state = AppState::new(store, generator, config.clone());

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
