//! Reset the game tables and fill them with sample data
//!
//! Uses the same configuration as the server (`config/*.toml`, `GAMEPORTAL__*`).

use gameportal::{config, data};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::load_unvalidated()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = data::Database::connect(&config.database.path).await?;
    tracing::info!(path = %config.database.path.display(), "Reseeding database...");

    let mut rng = rand::thread_rng();
    data::seed::reseed(&db, &mut rng).await?;

    db.close().await;
    tracing::info!("Database reseeded successfully");
    Ok(())
}
