//! Pending relationship delta of one instance.

use super::InstanceId;

/// Additions and removals not yet written to the association store.
///
/// Both lists keep insertion order and never hold two handles for the same
/// entity. Identity is decided by the caller through the `same` predicate,
/// since two handles may denote one persisted row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingDelta {
    additions: Vec<InstanceId>,
    removals: Vec<InstanceId>,
}

impl PendingDelta {
    pub fn additions(&self) -> &[InstanceId] {
        &self.additions
    }

    pub fn removals(&self) -> &[InstanceId] {
        &self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    pub(crate) fn is_adding(&self, same: &dyn Fn(InstanceId) -> bool) -> bool {
        self.additions.iter().any(|x| same(*x))
    }

    pub(crate) fn is_removing(&self, same: &dyn Fn(InstanceId) -> bool) -> bool {
        self.removals.iter().any(|x| same(*x))
    }

    /// Schedule `other` for addition, cancelling a pending removal.
    pub(crate) fn add(&mut self, other: InstanceId, same: &dyn Fn(InstanceId) -> bool) {
        self.removals.retain(|x| !same(*x));
        if !self.is_adding(same) {
            self.additions.push(other);
        }
    }

    /// Cancel a pending addition of `other`; when `record` is set, also
    /// schedule the stored pair for deletion.
    pub(crate) fn remove(
        &mut self,
        other: InstanceId,
        record: bool,
        same: &dyn Fn(InstanceId) -> bool,
    ) {
        self.additions.retain(|x| !same(*x));
        if record && !self.is_removing(same) {
            self.removals.push(other);
        }
    }

    /// Drop every pending entry matching `same`.
    pub(crate) fn forget(&mut self, same: &dyn Fn(InstanceId) -> bool) {
        self.additions.retain(|x| !same(*x));
        self.removals.retain(|x| !same(*x));
    }

    pub(crate) fn clear(&mut self) {
        self.additions.clear();
        self.removals.clear();
    }
}
