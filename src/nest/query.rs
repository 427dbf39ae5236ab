//! Persisted-state queries
//!
//! Unlike the manager, these ignore pending deltas: an entity related in
//! memory but not yet saved is not counted.

use std::marker::PhantomData;

use sqlx::SqlitePool;
use tracing::debug;

use crate::db::AssociationStore;
use crate::error::Result;
use crate::orm::{ParentEntity, find_by_ids};

pub struct NestQuery<'a, E> {
    pool: &'a SqlitePool,
    store: &'a AssociationStore,
    _entity: PhantomData<E>,
}

impl<'a, E: ParentEntity> NestQuery<'a, E> {
    pub fn new(pool: &'a SqlitePool, store: &'a AssociationStore) -> Self {
        Self {
            pool,
            store,
            _entity: PhantomData,
        }
    }

    /// Number of stored pairs containing `entity`. Zero when it has no key.
    pub async fn count_related_of(&self, entity: &E) -> Result<i64> {
        let Some(id) = entity.id() else {
            return Ok(0);
        };

        let mut conn = self.pool.acquire().await?;
        self.store.count_for(&mut conn, id).await
    }

    /// Stored partners of `entity`, ordered by key. Empty when it has no key.
    pub async fn find_related_of(&self, entity: &E) -> Result<Vec<E>> {
        let Some(id) = entity.id() else {
            return Ok(Vec::new());
        };

        let mut conn = self.pool.acquire().await?;
        let partner_ids = self.store.find_partner_ids_of(&mut conn, id).await?;
        let partners = find_by_ids::<E>(&mut conn, &partner_ids).await?;
        debug!(table = E::TABLE_NAME, id, found = partners.len(), "Loaded stored partners");

        Ok(partners)
    }

    /// Total number of stored pairs in the junction
    pub async fn count(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        self.store.count(&mut conn).await
    }
}
