//! Host ORM layer
//!
//! Minimal entity model the relationship runtime is built on:
//! - Table metadata (`DatabaseEntity`, `DatabaseSchema`)
//! - Row decoding (`FromSqlRow`)
//! - Identity and persistence of parent entities (`ParentEntity`)
//! - Generic lookups by primary key (repository functions)
//!
//! # Example
//!
//! ```rust,ignore
//! let mut conn = db.pool().acquire().await?;
//! let people: Vec<Person> = find_by_ids(&mut conn, &[1, 2, 3]).await?;
//! let total = count::<Person>(&mut conn).await?;
//! ```

mod repository;
mod traits;

pub use repository::*;
pub use traits::*;
