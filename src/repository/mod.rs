//! Repository layer for database operations

pub mod books;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};

use crate::{config::DatabaseConfig, error::AppResult};

/// Database connection pool
pub type DbPool = Pool<Sqlite>;

/// Main repository struct holding the database connection pool.
///
/// Connections are checked out per operation and returned to the pool on
/// every exit path, errors included.
#[derive(Clone)]
pub struct Repository {
    pub pool: DbPool,
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the store, used by readiness checks
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open a connection pool for the configured database.
///
/// File databases are created when missing and run in WAL mode. An in-memory
/// database only lives as long as its connection, so those pools are pinned
/// to a single connection that is never recycled.
pub async fn connect(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// Create the schema if needed. Safe to run on every start.
pub async fn bootstrap(pool: &DbPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database schema ready");
    Ok(())
}

/// Connect and bootstrap in one step
pub async fn open(config: &DatabaseConfig) -> AppResult<Repository> {
    let pool = connect(config).await?;
    bootstrap(&pool).await?;
    Ok(Repository::new(pool))
}
