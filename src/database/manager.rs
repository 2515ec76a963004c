use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::CONFIG;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Postgres SQLSTATE of a failed statement, if the server reported one
    pub fn sql_state(&self) -> Option<String> {
        match self {
            DatabaseError::Sqlx(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    /// Name of the violated constraint, if any
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::Sqlx(sqlx::Error::Database(db)) => db.constraint(),
            _ => None,
        }
    }
}

/// Connection pool construction and schema migrations
pub struct DatabaseManager;

impl DatabaseManager {
    pub fn database_url() -> Result<String, DatabaseError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(&url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        Ok(url)
    }

    fn pool_options() -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(CONFIG.database.max_connections)
            .acquire_timeout(Duration::from_secs(CONFIG.database.connection_timeout))
    }

    /// Open the pool and wait for the first connection
    pub async fn connect() -> Result<PgPool, DatabaseError> {
        let url = Self::database_url()?;
        let pool = Self::pool_options().connect(&url).await?;
        info!(
            "Connected to database (max {} connections)",
            CONFIG.database.max_connections
        );
        Ok(pool)
    }

    /// Build the pool without touching the server; connections open on first use
    pub fn connect_lazy(url: &str) -> Result<PgPool, DatabaseError> {
        Ok(Self::pool_options().connect_lazy(url)?)
    }

    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
