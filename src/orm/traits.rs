//! Core traits for the host ORM layer
//!
//! Application entities implement these by hand (or through their own
//! derive macros); the relationship runtime only relies on what is declared
//! here.

use sqlx::SqliteConnection;
use sqlx::sqlite::SqliteRow;

use crate::schema::TableSchema;

/// Primary-key value of a parent entity (SQLite integer key).
pub type EntityId = i64;

/// Metadata about a database entity (table).
pub trait DatabaseEntity: Sized + Send + Sync {
    /// The SQL table name (e.g., "person")
    const TABLE_NAME: &'static str;

    /// The primary key column name (e.g., "id")
    const PRIMARY_KEY: &'static str;

    /// List of all column names in the table
    fn column_names() -> &'static [&'static str];

    /// Build a SELECT query for all columns
    fn select_sql() -> String {
        let columns = Self::column_names().join(", ");
        format!("SELECT {} FROM {}", columns, Self::TABLE_NAME)
    }
}

/// Trait for database schema generation.
pub trait DatabaseSchema: DatabaseEntity {
    /// Declarative description of the entity's table
    fn table_schema() -> TableSchema;

    /// Generate CREATE TABLE IF NOT EXISTS SQL
    fn create_table_sql() -> String {
        Self::table_schema().create_table_sql()
    }
}

/// Trait for decoding a database row into an entity.
pub trait FromSqlRow: Sized {
    /// Decode a SQLite row into this entity type
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// An entity that can own a symmetric self-relationship.
///
/// The entity carries its own key: `None` until the row has been inserted.
/// `insert` and `update` receive the connection of the surrounding
/// transaction and must not open another one.
#[allow(async_fn_in_trait)]
pub trait ParentEntity: DatabaseEntity + FromSqlRow {
    /// Assigned primary key, if the entity has been persisted
    fn id(&self) -> Option<EntityId>;

    /// Record the key assigned by the database
    fn set_id(&mut self, id: EntityId);

    /// Insert a new row and return the key the database assigned.
    async fn insert(&self, conn: &mut SqliteConnection) -> Result<EntityId, sqlx::Error>;

    /// Write the entity's current state over its existing row.
    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error>;
}
