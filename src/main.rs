//! GamePortal binary entry point

use gameportal::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from `logging.*`
/// 3. Initialize metrics
/// 4. Initialize AppState
/// 5. Build Axum router
/// 6. Start background tasks (expired session cleanup)
/// 7. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);

    tracing::info!("Starting GamePortal...");
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        allow_listed = config.auth.allowed_github_ids.len(),
        "Configuration loaded"
    );

    // 3. Initialize metrics
    gameportal::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = gameportal::build_router(state.clone());

    // 6. Start background tasks
    if config.auth.session_cleanup_interval_seconds > 0 {
        spawn_session_cleanup_task(state.clone());
    } else {
        tracing::info!("Expired session cleanup disabled");
    }

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `logging.level` when set.
fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Spawn background task purging expired sessions
///
/// Expired sessions are also removed lazily on validation; this catches
/// sessions whose cookie is never presented again.
fn spawn_session_cleanup_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.auth.session_cleanup_interval_seconds;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            match state
                .db
                .delete_expired_auth_sessions(chrono::Utc::now())
                .await
            {
                Ok(0) => tracing::debug!("No expired sessions to purge"),
                Ok(removed) => {
                    gameportal::metrics::EXPIRED_SESSIONS_PURGED_TOTAL.inc_by(removed);
                    tracing::info!(removed, "Expired sessions purged");
                }
                Err(error) => tracing::error!(%error, "Expired session cleanup failed"),
            }
        }
    });

    tracing::info!("Session cleanup task spawned");
}
