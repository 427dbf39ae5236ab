//! Database connection, schema synchronisation and the association store

pub mod associations;
pub mod schema_sync;

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

pub use associations::AssociationStore;
pub use schema_sync::{SchemaSyncResult, sync_entity, sync_junction, sync_schema};

/// Default pool size when `DATABASE_MAX_CONNECTIONS` is not set
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new connection pool.
    ///
    /// In-memory databases exist per connection, so they get a single
    /// connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(10))
                .connect_with(options)
                .await?
        };

        info!(url = %url, "Connected to database");
        Ok(Self { pool })
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create a new connection pool, retrying until `timeout` elapses
    pub async fn connect_with_retry(
        url: &str,
        max_connections: u32,
        timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let deadline = Instant::now() + timeout;
        let retry_interval = Duration::from_millis(500);

        loop {
            match Self::connect(url, max_connections).await {
                Ok(db) => return Ok(db),
                Err(e) if Instant::now() + retry_interval < deadline => {
                    warn!(
                        error = %e,
                        "Database connection failed, retrying in {}ms",
                        retry_interval.as_millis()
                    );
                    tokio::time::sleep(retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
