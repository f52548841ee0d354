//! Budgetlock API Server
//!
//! Main entry point for the budget allocation service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use budgetlock_api::{AppState, clients::HttpNotesAssistant, create_router};
use budgetlock_db::connect_with_pool;
use budgetlock_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "budgetlock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let notes = HttpNotesAssistant::from_config(&config.notes)
        .context("Failed to build notes service client")?;
    match &notes {
        Some(client) => info!(
            endpoint = %client.endpoint(),
            timeout_secs = config.notes.timeout_secs,
            "Notes cleanup service configured"
        ),
        None => info!("Notes cleanup service disabled"),
    }

    let app = create_router(AppState::new(&db, notes));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
