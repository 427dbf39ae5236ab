//! equal-nest - schema tool for symmetric self-relationships
//!
//! Reads a schema document, configures every `equal_nest` behavior in it and
//! prints the resulting DDL. With `--apply` the tables are created in the
//! configured database.

use std::time::Duration;

use anyhow::{Context, bail};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use equal_nest::cli::CliOptions;
use equal_nest::config::Config;
use equal_nest::{Database, Schema, sync_schema};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let options = CliOptions::from_args();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "equal_nest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let Some(schema_path) = options.schema_path.or(config.schema_path) else {
        bail!("usage: equal-nest <schema.yaml> [--apply] [--database-url URL] [--json]");
    };

    let source = std::fs::read_to_string(&schema_path)
        .with_context(|| format!("Failed to read schema document {}", schema_path))?;
    let schema = Schema::from_yaml(&source)
        .with_context(|| format!("Failed to parse schema document {}", schema_path))?;
    let junctions = schema
        .junction_tables()
        .context("Failed to configure equal_nest behaviors")?;
    tracing::info!(path = %schema_path, junctions = junctions.len(), "Schema loaded");

    if options.json {
        println!("{}", serde_json::to_string_pretty(&junctions)?);
    } else {
        for statement in schema.create_sql()? {
            println!("{};", statement);
        }
    }

    if !options.apply {
        return Ok(());
    }

    let database_url = options.database_url.unwrap_or(config.database_url);
    let db = Database::connect_with_retry(
        &database_url,
        config.max_connections,
        Duration::from_secs(10),
    )
    .await
    .with_context(|| format!("Failed to connect to {}", database_url))?;

    let result = sync_schema(db.pool(), &schema).await?;
    for error in &result.errors {
        tracing::error!(error = %error, "Schema sync problem");
    }
    if !result.is_ok() {
        bail!("schema sync finished with {} error(s)", result.errors.len());
    }

    tracing::info!(
        tables_created = result.tables_created.len(),
        columns_added = result.columns_added.len(),
        "Schema applied"
    );
    Ok(())
}
