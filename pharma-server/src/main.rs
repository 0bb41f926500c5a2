use pharma_server::{Config, Server, ServerState, init_logger, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    dotenv::dotenv().ok();
    init_logger();

    print_banner();
    tracing::info!("💊 PharmaFlow auth server starting...");

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize server state (fatal if the permission matrix is unusable)
    let state = ServerState::initialize(&config)?;

    // 4. Run the HTTP server until shutdown
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
