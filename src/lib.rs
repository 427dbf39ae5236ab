//! Symmetric self-referential relationships for SQLite-backed entities.
//!
//! A schema table carrying the `equal_nest` behavior becomes a junction of
//! unordered pairs of its parent table's rows. `RelationshipManager` keeps
//! the in-memory side of those pairs consistent and writes them when an
//! instance is saved; `NestQuery` reads what is stored. The `equal_nest!`
//! macro names the operations after the relation (`add_friend`, ...).

pub mod behavior;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod nest;
pub mod orm;
pub mod schema;

pub use behavior::{EqualNestBehavior, JunctionTable};
pub use db::{AssociationStore, Database, SchemaSyncResult, sync_junction, sync_schema};
pub use error::{NestError, Result};
pub use nest::{InstanceId, NestQuery, PendingDelta, RelationshipManager};
pub use orm::{DatabaseEntity, DatabaseSchema, EntityId, FromSqlRow, ParentEntity};
pub use schema::{BehaviorSchema, ColumnSchema, ColumnType, Schema, TableSchema};

pub use equal_nest_macros::equal_nest;
