//! Symmetric self-relationships ("equal nests")
//!
//! `RelationshipManager` holds parent-entity instances together with their
//! pending relationship deltas and flushes them through the association
//! store when an instance is saved. `NestQuery` answers the same questions
//! from persisted state only.

mod delta;
mod manager;
mod query;
mod unit_of_work;

pub use delta::PendingDelta;
pub use manager::{InstanceId, RelationshipManager};
pub use query::NestQuery;
