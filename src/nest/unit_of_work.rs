//! Work collected for one save.
//!
//! A save runs in two phases inside one transaction. The first phase writes
//! parent rows and records the keys the database assigns. The second phase
//! resolves every pending pair against those keys and flushes it; a pair
//! whose endpoints are still unassigned at that point is an error. Keys are
//! handed back to the instances only after the commit.

use std::collections::HashMap;

use super::InstanceId;
use crate::orm::EntityId;

#[derive(Debug, Default)]
pub(crate) struct UnitOfWork {
    /// Instances without a row, in insertion order
    pub inserts: Vec<InstanceId>,
    /// Instances with a row to rewrite
    pub updates: Vec<InstanceId>,
    /// Pairs to store
    pub links: Vec<(InstanceId, InstanceId)>,
    /// Pairs to delete
    pub unlinks: Vec<(InstanceId, InstanceId)>,
    assigned: HashMap<InstanceId, EntityId>,
}

impl UnitOfWork {
    pub fn schedule_insert(&mut self, iid: InstanceId) {
        if !self.inserts.contains(&iid) {
            self.inserts.push(iid);
        }
    }

    pub fn record_assigned(&mut self, iid: InstanceId, id: EntityId) {
        self.assigned.insert(iid, id);
    }

    /// Key of `iid`: the one it already carries, else the one assigned in
    /// the insert phase.
    pub fn resolve(&self, iid: InstanceId, current: Option<EntityId>) -> Option<EntityId> {
        current.or_else(|| self.assigned.get(&iid).copied())
    }

    pub fn assigned(&self) -> impl Iterator<Item = (InstanceId, EntityId)> + '_ {
        self.assigned.iter().map(|(iid, id)| (*iid, *id))
    }
}
