use anyhow::Context;
use stock_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. dotenv, work dir, logging
    setup_environment()?;
    print_banner();
    tracing::info!("Stock server starting...");

    // 2. configuration
    let config = Config::from_env().context("Failed to load JWT configuration")?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;
    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        timezone = %config.timezone,
        "Configuration loaded"
    );

    // 3. state (opens the redb store)
    let state = ServerState::initialize(&config).context("Failed to open inventory store")?;

    // 4. serve; background tasks start with the server
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
