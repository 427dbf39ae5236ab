//! Relationship manager
//!
//! Owns parent-entity instances and their pending deltas. Mutations are
//! in-memory and always paired: relating `a` to `b` records `b` on `a` and
//! `a` on `b`, so both sides agree before anything is written. `save` flushes
//! one instance's delta inside the transaction that writes its row.
//!
//! Membership is decided by primary key once one is assigned, and by handle
//! before that. The manager holds at most one instance per key: `attach` and
//! `load` hand back the attached instance when the key is already known.

use std::borrow::Borrow;
use std::fmt;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::unit_of_work::UnitOfWork;
use super::{NestQuery, PendingDelta};
use crate::behavior::JunctionTable;
use crate::db::AssociationStore;
use crate::error::{NestError, Result};
use crate::orm::{EntityId, ParentEntity, delete_by_id, find_by_id, find_by_ids};

/// Handle to an instance held by a `RelationshipManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance #{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Identity {
    Row(EntityId),
    Instance(InstanceId),
}

struct Slot<E> {
    entity: E,
    delta: PendingDelta,
}

/// Symmetric self-relationship manager for one junction table.
///
/// Keys are bound as SQLite integers, so the parent key must be an integer
/// column.
pub struct RelationshipManager<E: ParentEntity> {
    pool: SqlitePool,
    store: AssociationStore,
    slots: Vec<Option<Slot<E>>>,
}

impl<E: ParentEntity> fmt::Debug for RelationshipManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipManager")
            .field("junction", &self.store.junction().name)
            .field("instances", &self.slots.iter().flatten().count())
            .finish_non_exhaustive()
    }
}

impl<E: ParentEntity> RelationshipManager<E> {
    /// Create a manager for `E` over `junction`.
    ///
    /// The junction must have been configured for `E`'s table and key.
    pub fn new(pool: SqlitePool, junction: JunctionTable) -> Result<Self> {
        if junction.parent_table != E::TABLE_NAME || junction.parent_key != E::PRIMARY_KEY {
            return Err(NestError::UnsupportedSchema(format!(
                "junction {} relates {}.{}, not {}.{}",
                junction.name,
                junction.parent_table,
                junction.parent_key,
                E::TABLE_NAME,
                E::PRIMARY_KEY
            )));
        }
        if !junction.key_type.is_integer() {
            return Err(NestError::UnsupportedSchema(format!(
                "{}.{} is {}; only integer parent keys can be related",
                junction.parent_table,
                junction.parent_key,
                junction.key_type.as_sql()
            )));
        }

        Ok(Self {
            pool,
            store: AssociationStore::new(junction),
            slots: Vec::new(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn store(&self) -> &AssociationStore {
        &self.store
    }

    /// Persisted-state queries over the same junction
    pub fn query(&self) -> NestQuery<'_, E> {
        NestQuery::new(&self.pool, &self.store)
    }

    // ── Instances ────────────────────────────────────────────

    /// Hand an entity (persisted or not) to the manager.
    ///
    /// A persisted entity whose key is already attached refreshes that
    /// instance and returns its handle, so one row never has two deltas.
    pub fn attach(&mut self, entity: E) -> InstanceId {
        if let Some(iid) = entity.id().and_then(|id| self.find_attached(id)) {
            if let Some(Some(slot)) = self.slots.get_mut(iid.0) {
                slot.entity = entity;
            }
            debug!(table = E::TABLE_NAME, instance = %iid, "Reusing attached instance");
            return iid;
        }

        let iid = InstanceId::new(self.slots.len());
        self.slots.push(Some(Slot {
            entity,
            delta: PendingDelta::default(),
        }));
        iid
    }

    /// Instance for the row with key `id`, loading it if no attached
    /// instance carries that key.
    pub async fn load(&mut self, id: EntityId) -> Result<Option<InstanceId>> {
        if let Some(iid) = self.find_attached(id) {
            return Ok(Some(iid));
        }

        let mut conn = self.pool.acquire().await?;
        let entity = find_by_id::<E>(&mut conn, id).await?;
        Ok(entity.map(|e| self.attach(e)))
    }

    pub fn entity(&self, iid: InstanceId) -> Result<&E> {
        Ok(&self.slot(iid)?.entity)
    }

    /// Mutable access to the entity's fields. Its key must not be changed
    /// through this reference.
    pub fn entity_mut(&mut self, iid: InstanceId) -> Result<&mut E> {
        Ok(&mut self.slot_mut(iid)?.entity)
    }

    /// Unflushed additions and removals of `iid`
    pub fn pending(&self, iid: InstanceId) -> Result<&PendingDelta> {
        Ok(&self.slot(iid)?.delta)
    }

    fn slot(&self, iid: InstanceId) -> Result<&Slot<E>> {
        self.slots
            .get(iid.0)
            .and_then(Option::as_ref)
            .ok_or(NestError::UnknownInstance(iid))
    }

    fn slot_mut(&mut self, iid: InstanceId) -> Result<&mut Slot<E>> {
        self.slots
            .get_mut(iid.0)
            .and_then(Option::as_mut)
            .ok_or(NestError::UnknownInstance(iid))
    }

    fn find_attached(&self, id: EntityId) -> Option<InstanceId> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.as_ref()
                .filter(|s| s.entity.id() == Some(id))
                .map(|_| InstanceId::new(index))
        })
    }

    fn id_of(&self, iid: InstanceId) -> Result<Option<EntityId>> {
        Ok(self.slot(iid)?.entity.id())
    }

    fn identity(&self, iid: InstanceId) -> Result<Identity> {
        Ok(match self.id_of(iid)? {
            Some(id) => Identity::Row(id),
            None => Identity::Instance(iid),
        })
    }

    fn is_same(&self, a: InstanceId, b: InstanceId) -> Result<bool> {
        Ok(self.identity(a)? == self.identity(b)?)
    }

    /// Predicate matching every handle that denotes the same entity as `target`.
    fn matcher(&self, target: InstanceId) -> Result<impl Fn(InstanceId) -> bool + '_> {
        let identity = self.identity(target)?;
        Ok(move |x| self.identity(x).is_ok_and(|i| i == identity))
    }

    fn contains(&self, members: &[InstanceId], target: InstanceId) -> Result<bool> {
        let same = self.matcher(target)?;
        Ok(members.iter().any(|m| same(*m)))
    }

    /// Apply `change` to `owner`'s delta, with a predicate matching `other`.
    fn update_delta(
        &mut self,
        owner: InstanceId,
        other: InstanceId,
        change: impl FnOnce(&mut PendingDelta, &dyn Fn(InstanceId) -> bool),
    ) -> Result<()> {
        let mut delta = std::mem::take(&mut self.slot_mut(owner)?.delta);
        let result = self.matcher(other).map(|same| change(&mut delta, &same));
        self.slot_mut(owner)?.delta = delta;
        result
    }

    // ── Relationship operations ──────────────────────────────

    /// Whether `b` belongs to `a`'s current set (persisted, adjusted by the
    /// pending deltas of both sides).
    pub async fn has_related(&self, a: InstanceId, b: InstanceId) -> Result<bool> {
        if self.is_same(a, b)? {
            return Ok(false);
        }

        let pending = {
            let same_as_a = self.matcher(a)?;
            let same_as_b = self.matcher(b)?;
            let (own, theirs) = (&self.slot(a)?.delta, &self.slot(b)?.delta);

            if own.is_adding(&same_as_b) {
                Some(true)
            } else if own.is_removing(&same_as_b) {
                Some(false)
            } else if theirs.is_adding(&same_as_a) {
                Some(true)
            } else if theirs.is_removing(&same_as_a) {
                Some(false)
            } else {
                None
            }
        };
        if let Some(related) = pending {
            return Ok(related);
        }

        match (self.id_of(a)?, self.id_of(b)?) {
            (Some(x), Some(y)) => {
                let mut conn = self.pool.acquire().await?;
                self.store.exists(&mut conn, x, y).await
            }
            _ => Ok(false),
        }
    }

    /// Relate `a` and `b`. Idempotent; relating an entity to itself is ignored.
    pub fn add_related(&mut self, a: InstanceId, b: InstanceId) -> Result<()> {
        if self.is_same(a, b)? {
            debug!(table = E::TABLE_NAME, instance = %a, "Ignoring self relation");
            return Ok(());
        }

        self.update_delta(a, b, |delta, same| delta.add(b, same))?;
        self.update_delta(b, a, |delta, same| delta.add(a, same))?;
        debug!(table = E::TABLE_NAME, %a, %b, "Scheduled relation");
        Ok(())
    }

    /// Unrelate `a` and `b`. Idempotent.
    pub fn remove_related(&mut self, a: InstanceId, b: InstanceId) -> Result<()> {
        if self.is_same(a, b)? {
            return Ok(());
        }

        // A stored pair needs both keys; otherwise only pending additions go
        let record = self.id_of(a)?.is_some() && self.id_of(b)?.is_some();
        self.update_delta(a, b, |delta, same| delta.remove(b, record, same))?;
        self.update_delta(b, a, |delta, same| delta.remove(a, record, same))?;
        debug!(table = E::TABLE_NAME, %a, %b, record, "Scheduled unrelation");
        Ok(())
    }

    /// `a`'s current set: stored partners (attached as instances, reusing
    /// attached ones by key) minus pending removals, then pending additions.
    pub async fn related(&mut self, a: InstanceId) -> Result<Vec<InstanceId>> {
        let mut members = Vec::new();

        if let Some(id) = self.id_of(a)? {
            let mut conn = self.pool.acquire().await?;
            let partner_ids = self.persisted_partners(&mut conn, a, id).await?;
            members = self.resolve_ids(&mut conn, &partner_ids).await?;
        }

        let additions = self.slot(a)?.delta.additions().to_vec();
        for added in additions {
            if !self.contains(&members, added)? {
                members.push(added);
            }
        }

        Ok(members)
    }

    /// Replace `a`'s set with `collection`, leaving unchanged members alone.
    pub async fn set_related<I>(&mut self, a: InstanceId, collection: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<InstanceId>,
    {
        let mut desired: Vec<InstanceId> = Vec::new();
        for item in collection {
            let iid = *item.borrow();
            if self.is_same(a, iid)? || self.contains(&desired, iid)? {
                continue;
            }
            desired.push(iid);
        }

        let current = self.related(a).await?;
        for member in &current {
            if !self.contains(&desired, *member)? {
                self.remove_related(a, *member)?;
            }
        }
        for wanted in desired {
            if !self.contains(&current, wanted)? {
                self.add_related(a, wanted)?;
            }
        }

        Ok(())
    }

    /// Relate `a` to every element of `collection`.
    pub fn add_many<I>(&mut self, a: InstanceId, collection: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<InstanceId>,
    {
        let others = self.validated(a, collection)?;
        for other in others {
            self.add_related(a, other)?;
        }
        Ok(())
    }

    /// Unrelate `a` from every element of `collection`.
    pub fn remove_many<I>(&mut self, a: InstanceId, collection: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<InstanceId>,
    {
        let others = self.validated(a, collection)?;
        for other in others {
            self.remove_related(a, other)?;
        }
        Ok(())
    }

    /// Unrelate `a` from every current member, stored or pending.
    pub async fn clear_related(&mut self, a: InstanceId) -> Result<()> {
        let members = self.related(a).await?;
        for member in members {
            self.remove_related(a, member)?;
        }
        Ok(())
    }

    /// Size of `a`'s current set, without loading partner entities.
    pub async fn count_related(&self, a: InstanceId) -> Result<usize> {
        let slot = self.slot(a)?;
        let Some(id) = slot.entity.id() else {
            return Ok(slot.delta.additions().len());
        };

        let mut conn = self.pool.acquire().await?;
        if slot.delta.is_empty() {
            return Ok(self.store.count_for(&mut conn, id).await? as usize);
        }

        let partners = self.persisted_partners(&mut conn, a, id).await?;
        let added = slot
            .delta
            .additions()
            .iter()
            .filter(|x| match self.id_of(**x) {
                Ok(Some(xid)) => !partners.contains(&xid),
                _ => true,
            })
            .count();

        Ok(partners.len() + added)
    }

    /// Check every handle before any delta is touched.
    fn validated<I>(&self, a: InstanceId, collection: I) -> Result<Vec<InstanceId>>
    where
        I: IntoIterator,
        I::Item: Borrow<InstanceId>,
    {
        self.identity(a)?;
        let others: Vec<InstanceId> = collection.into_iter().map(|x| *x.borrow()).collect();
        for other in &others {
            self.identity(*other)?;
        }
        Ok(others)
    }

    /// Stored partner keys of `a`, minus its pending removals.
    async fn persisted_partners(
        &self,
        conn: &mut SqliteConnection,
        a: InstanceId,
        id: EntityId,
    ) -> Result<Vec<EntityId>> {
        let partner_ids = self.store.find_partner_ids_of(conn, id).await?;
        let removed: Vec<EntityId> = self
            .slot(a)?
            .delta
            .removals()
            .iter()
            .filter_map(|r| self.id_of(*r).ok().flatten())
            .collect();

        Ok(partner_ids
            .into_iter()
            .filter(|p| !removed.contains(p))
            .collect())
    }

    /// Instances for `ids`, in order, loading the ones not attached yet.
    async fn resolve_ids(
        &mut self,
        conn: &mut SqliteConnection,
        ids: &[EntityId],
    ) -> Result<Vec<InstanceId>> {
        let missing: Vec<EntityId> = ids
            .iter()
            .copied()
            .filter(|id| self.find_attached(*id).is_none())
            .collect();

        let loaded: Vec<E> = find_by_ids(conn, &missing).await?;
        for entity in loaded {
            self.attach(entity);
        }

        Ok(ids.iter().filter_map(|id| self.find_attached(*id)).collect())
    }

    // ── Persistence ──────────────────────────────────────────

    /// Write `a` and flush its pending delta in one transaction.
    ///
    /// Unsaved partners are inserted first. On failure nothing is committed
    /// and every instance keeps its state.
    pub async fn save(&mut self, a: InstanceId) -> Result<()> {
        let mut work = self.plan(a)?;

        let mut tx = self.pool.begin().await?;
        let (linked, unlinked) = self.flush(&mut tx, &mut work).await?;
        tx.commit().await?;

        self.apply(a, &work)?;
        info!(
            table = E::TABLE_NAME,
            instance = %a,
            inserted = work.inserts.len(),
            linked,
            unlinked,
            "Saved entity"
        );
        Ok(())
    }

    fn plan(&self, a: InstanceId) -> Result<UnitOfWork> {
        let mut work = UnitOfWork::default();
        let slot = self.slot(a)?;

        match slot.entity.id() {
            Some(_) => work.updates.push(a),
            None => work.schedule_insert(a),
        }
        for other in slot.delta.additions() {
            if self.id_of(*other)?.is_none() {
                work.schedule_insert(*other);
            }
            work.links.push((a, *other));
        }
        for other in slot.delta.removals() {
            work.unlinks.push((a, *other));
        }

        Ok(work)
    }

    async fn flush(
        &self,
        conn: &mut SqliteConnection,
        work: &mut UnitOfWork,
    ) -> Result<(usize, usize)> {
        // Phase 1: parent rows
        for iid in work.updates.clone() {
            self.slot(iid)?.entity.update(conn).await?;
        }
        for iid in work.inserts.clone() {
            let id = self.slot(iid)?.entity.insert(conn).await?;
            work.record_assigned(iid, id);
        }

        // Phase 2: pairs, resolved against the keys assigned above
        let mut linked = 0;
        for (owner, other) in &work.links {
            let x = work.resolve(*owner, self.id_of(*owner)?);
            let y = work.resolve(*other, self.id_of(*other)?);
            let (Some(x), Some(y)) = (x, y) else {
                return Err(NestError::UnresolvedIdentity(format!(
                    "{} -> {} has no key after the insert phase",
                    owner, other
                )));
            };
            if x == y || self.store.exists(conn, x, y).await? {
                continue;
            }
            match self.store.insert(conn, x, y).await {
                Ok(()) => linked += 1,
                Err(NestError::DuplicateAssociation { first, second }) => {
                    debug!(first, second, "Pair stored concurrently, treating as related");
                }
                Err(e) => return Err(e),
            }
        }

        let mut unlinked = 0;
        for (owner, other) in &work.unlinks {
            let x = work.resolve(*owner, self.id_of(*owner)?);
            let y = work.resolve(*other, self.id_of(*other)?);
            if let (Some(x), Some(y)) = (x, y) {
                if self.store.delete(conn, x, y).await? {
                    unlinked += 1;
                }
            }
        }

        Ok((linked, unlinked))
    }

    /// Post-commit: hand out assigned keys and drop the flushed entries on
    /// both sides of every pair.
    fn apply(&mut self, a: InstanceId, work: &UnitOfWork) -> Result<()> {
        for (iid, id) in work.assigned() {
            self.slot_mut(iid)?.entity.set_id(id);
        }

        let partners: Vec<InstanceId> = {
            let delta = &self.slot(a)?.delta;
            delta
                .additions()
                .iter()
                .chain(delta.removals())
                .copied()
                .collect()
        };
        self.slot_mut(a)?.delta.clear();
        for partner in partners {
            self.update_delta(partner, a, |delta, same| delta.forget(same))?;
        }

        Ok(())
    }

    /// Delete `a`'s row and every stored pair containing it, then release
    /// the handle.
    pub async fn delete(&mut self, a: InstanceId) -> Result<()> {
        if let Some(id) = self.id_of(a)? {
            let mut tx = self.pool.begin().await?;
            let removed = self.store.delete_all_for(&mut tx, id).await?;
            delete_by_id::<E>(&mut tx, id).await?;
            tx.commit().await?;
            info!(table = E::TABLE_NAME, id, pairs = removed, "Deleted entity");
        }

        for slot in self.slots.iter_mut().flatten() {
            slot.delta.forget(&|x: InstanceId| x == a);
        }
        self.slots[a.0] = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_display() {
        let iid = InstanceId::new(3);
        assert_eq!(iid.index(), 3);
        assert_eq!(iid.to_string(), "instance #3");
        assert_eq!(
            NestError::UnknownInstance(iid).to_string(),
            "instance #3 is not held by this manager"
        );
    }
}
