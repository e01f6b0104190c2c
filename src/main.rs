//! Book inventory server
//!
//! REST API over the book catalog.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use book_inventory::{api, config::AppConfig, logging, repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let _log_guard = logging::init(&config.logging, std::io::stdout());

    tracing::info!("Starting book inventory server v{}", env!("CARGO_PKG_VERSION"));

    let pool = repository::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    repository::bootstrap(&pool)
        .await
        .context("Failed to prepare database schema")?;

    let services = Services::new(repository::Repository::new(pool));

    let state = AppState {
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
