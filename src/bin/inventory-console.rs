//! Console menu for the book inventory

use std::io;

use anyhow::Context;

use book_inventory::{
    config::AppConfig, console::Console, logging, repository, services::catalog::CatalogService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Logs go to stderr so they do not interleave with the menu
    let _log_guard = logging::init(&config.logging, io::stderr());

    let repository = repository::open(&config.database)
        .await
        .context("Failed to open database")?;

    let stdin = io::stdin();
    let mut console = Console::new(CatalogService::new(repository), stdin.lock(), io::stdout());
    console.run().await?;

    Ok(())
}
