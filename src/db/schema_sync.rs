//! Automatic schema synchronization
//!
//! - Creates missing entity tables and adds missing columns
//! - Creates junction tables and their indexes
//! - Checks that existing junction columns still match the parent key type
//! - Does NOT handle column renames or type changes

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::behavior::JunctionTable;
use crate::error::Result;
use crate::orm::DatabaseSchema;
use crate::schema::{ColumnSchema, Schema, TableSchema};

/// Result of a schema sync operation
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
    pub columns_added: Vec<(String, String)>, // (table, column)
    pub errors: Vec<String>,
}

impl SchemaSyncResult {
    fn merge(&mut self, other: SchemaSyncResult) {
        self.tables_created.extend(other.tables_created);
        self.columns_added.extend(other.columns_added);
        self.errors.extend(other.errors);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> std::result::Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Get existing columns for a table as (name, declared type)
async fn get_table_columns(
    pool: &SqlitePool,
    table_name: &str,
) -> std::result::Result<Vec<(String, String)>, sqlx::Error> {
    let rows: Vec<(i32, String, String, i32, Option<String>, i32)> =
        sqlx::query_as(&format!("PRAGMA table_info({})", table_name))
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(_, name, ty, _, _, _)| (name, ty))
        .collect())
}

/// Sync a table described by a `TableSchema`
async fn sync_table(pool: &SqlitePool, table: &TableSchema) -> Result<SchemaSyncResult> {
    let mut result = SchemaSyncResult::default();

    if !table_exists(pool, &table.name).await? {
        let create_sql = table.create_table_sql();
        debug!("Creating table {}: {}", table.name, create_sql);

        match sqlx::query(&create_sql).execute(pool).await {
            Ok(_) => {
                info!("Created table: {}", table.name);
                result.tables_created.push(table.name.clone());
            }
            Err(e) => {
                let msg = format!("Failed to create table {}: {}", table.name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
        return Ok(result);
    }

    let existing_columns = get_table_columns(pool, &table.name).await?;
    for col in &table.columns {
        if existing_columns.iter().any(|(name, _)| name == &col.name) {
            continue;
        }
        let alter_sql = generate_add_column_sql(&table.name, col);
        debug!("Adding column to {}: {}", table.name, alter_sql);

        match sqlx::query(&alter_sql).execute(pool).await {
            Ok(_) => {
                info!("Added column {}.{}", table.name, col.name);
                result
                    .columns_added
                    .push((table.name.clone(), col.name.clone()));
            }
            Err(e) => {
                let msg = format!("Failed to add column {}.{}: {}", table.name, col.name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    }

    Ok(result)
}

/// Sync a single entity's table to the database
pub async fn sync_entity<E: DatabaseSchema>(pool: &SqlitePool) -> Result<SchemaSyncResult> {
    sync_table(pool, &E::table_schema()).await
}

/// Create a junction table and its indexes, or verify an existing one.
pub async fn sync_junction(pool: &SqlitePool, junction: &JunctionTable) -> Result<SchemaSyncResult> {
    let mut result = SchemaSyncResult::default();

    if table_exists(pool, &junction.name).await? {
        let existing = get_table_columns(pool, &junction.name).await?;
        for col in junction.columns() {
            match existing.iter().find(|(name, _)| name == &col.name) {
                None => result.errors.push(format!(
                    "Junction {} is missing column {}",
                    junction.name, col.name
                )),
                Some((_, ty)) if !ty.eq_ignore_ascii_case(&col.sql_type()) => {
                    result.errors.push(format!(
                        "Junction column {}.{} is {} but the parent key is {}",
                        junction.name,
                        col.name,
                        ty,
                        col.sql_type()
                    ))
                }
                Some(_) => {}
            }
        }
        for msg in &result.errors {
            warn!("{}", msg);
        }
    } else {
        let create_sql = junction.create_table_sql();
        debug!("Creating junction {}: {}", junction.name, create_sql);
        sqlx::query(&create_sql).execute(pool).await?;
        info!(parent = %junction.parent_table, "Created junction table: {}", junction.name);
        result.tables_created.push(junction.name.clone());
    }

    for index_sql in junction.index_sql() {
        sqlx::query(&index_sql).execute(pool).await?;
    }

    Ok(result)
}

/// Sync every table of a schema document, junction tables included.
pub async fn sync_schema(pool: &SqlitePool, schema: &Schema) -> Result<SchemaSyncResult> {
    let junctions = schema.junction_tables()?;
    let mut total = SchemaSyncResult::default();

    for table in &schema.tables {
        if junctions.iter().any(|j| j.name == table.name) {
            continue;
        }
        total.merge(sync_table(pool, table).await?);
    }
    for junction in &junctions {
        total.merge(sync_junction(pool, junction).await?);
    }

    info!(
        tables_created = total.tables_created.len(),
        columns_added = total.columns_added.len(),
        errors = total.errors.len(),
        "Schema sync complete"
    );
    Ok(total)
}

/// Generate ALTER TABLE ADD COLUMN SQL
fn generate_add_column_sql(table_name: &str, col: &ColumnSchema) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table_name,
        col.name,
        col.sql_type()
    );

    // SQLite cannot add a NOT NULL column without a default
    if col.required {
        let default_val = match col.column_type.as_sql() {
            "TEXT" | "VARCHAR" | "CHAR" | "TIMESTAMP" => "''",
            "REAL" => "0.0",
            _ => "0",
        };
        sql.push_str(&format!(" NOT NULL DEFAULT {}", default_val));
    }

    sql
}
