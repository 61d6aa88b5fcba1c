//! Tic-tac-toe server.
//!
//! Configuration comes from the environment (`PORT`, `GRIDLOCK_ADDR`,
//! `GRIDLOCK_RESET_DELAY_MS`, ...); logging from `RUST_LOG`.

use gridlock::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridlock=info,tic_tac_toe=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        addr = %config.bind_addr,
        reset_delay_ms = config.reset_delay.as_millis() as u64,
        spectators = config.room.allow_spectators,
        "starting tic-tac-toe server"
    );

    let server = GameServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
