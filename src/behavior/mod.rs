//! Schema behaviors
//!
//! Behaviors are processed at schema-compilation time. They validate their
//! parameters against the schema and contribute tables to the generated DDL.

mod equal_nest;
mod junction;

pub use equal_nest::{
    DEFAULT_FIRST_COLUMN, DEFAULT_SECOND_COLUMN, EQUAL_NEST, EqualNestBehavior,
};
pub use junction::JunctionTable;
