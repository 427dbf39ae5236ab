//! Command-line tool configuration

use std::env;

use anyhow::{Context, Result};

use crate::db::DEFAULT_MAX_CONNECTIONS;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Schema document to process (overridden by the positional argument)
    pub schema_path: Option<String>,

    /// Database to apply the schema to
    /// Defaults to a throwaway in-memory SQLite database
    pub database_url: String,

    /// Pool size for file-backed databases
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            schema_path: env::var("SCHEMA_PATH").ok().filter(|p| !p.trim().is_empty()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),

            max_connections: match env::var("DATABASE_MAX_CONNECTIONS") {
                Ok(value) => value
                    .parse()
                    .context("Invalid DATABASE_MAX_CONNECTIONS")?,
                Err(_) => DEFAULT_MAX_CONNECTIONS,
            },
        })
    }
}
