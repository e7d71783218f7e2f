use anyhow::Context;
use dine_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (.env, work dir, logging)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config).context("failed to prepare work directory")?;

    print_banner();
    tracing::info!(
        environment = %config.environment,
        policy = %config.order_status_policy,
        "Dine server starting..."
    );

    // 2. State (store, managers, router)
    let state = ServerState::initialize(&config)
        .await
        .context("failed to initialize server state")?;

    // 3. Serve until ctrl-c
    Server::with_state(config, state)
        .run()
        .await
        .context("server stopped with an error")?;

    Ok(())
}
