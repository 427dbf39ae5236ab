//! Association store
//!
//! Reads and writes the unordered pairs of one junction table. Pairs are
//! normalised before they touch the database (smaller id first), which makes
//! every lookup order-independent.
//!
//! Every method takes the connection to run on so writes can join the
//! transaction of the parent save.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::behavior::JunctionTable;
use crate::error::{NestError, Result};
use crate::orm::EntityId;

/// Order a pair the way it is stored.
pub fn normalize(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Association store for one junction table
#[derive(Debug, Clone)]
pub struct AssociationStore {
    junction: JunctionTable,
}

impl AssociationStore {
    pub fn new(junction: JunctionTable) -> Self {
        Self { junction }
    }

    pub fn junction(&self) -> &JunctionTable {
        &self.junction
    }

    fn table(&self) -> &str {
        &self.junction.name
    }

    fn first(&self) -> &str {
        &self.junction.first_column
    }

    fn second(&self) -> &str {
        &self.junction.second_column
    }

    /// Whether `{a, b}` is stored, in either order
    pub async fn exists(
        &self,
        conn: &mut SqliteConnection,
        a: EntityId,
        b: EntityId,
    ) -> Result<bool> {
        let (first, second) = normalize(a, b);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE ({f} = ?1 AND {s} = ?2) OR ({f} = ?2 AND {s} = ?1)",
            self.table(),
            f = self.first(),
            s = self.second()
        );
        let row: (i64,) = sqlx::query_as(&sql)
            .bind(first)
            .bind(second)
            .fetch_one(&mut *conn)
            .await?;

        Ok(row.0 > 0)
    }

    /// Store `{a, b}`.
    ///
    /// Fails with `DuplicateAssociation` when the pair is already stored.
    pub async fn insert(&self, conn: &mut SqliteConnection, a: EntityId, b: EntityId) -> Result<()> {
        let (first, second) = normalize(a, b);
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            self.table(),
            self.first(),
            self.second()
        );

        match sqlx::query(&sql)
            .bind(first)
            .bind(second)
            .execute(&mut *conn)
            .await
        {
            Ok(_) => {
                debug!(table = %self.table(), first, second, "Inserted association");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(NestError::DuplicateAssociation { first, second })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `{a, b}` if present. Returns whether a row was removed.
    pub async fn delete(
        &self,
        conn: &mut SqliteConnection,
        a: EntityId,
        b: EntityId,
    ) -> Result<bool> {
        let (first, second) = normalize(a, b);
        let sql = format!(
            "DELETE FROM {} WHERE ({f} = ?1 AND {s} = ?2) OR ({f} = ?2 AND {s} = ?1)",
            self.table(),
            f = self.first(),
            s = self.second()
        );
        let result = sqlx::query(&sql)
            .bind(first)
            .bind(second)
            .execute(&mut *conn)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            debug!(table = %self.table(), first, second, "Deleted association");
        }
        Ok(removed)
    }

    /// Remove every pair containing `id`. Returns the number of rows removed.
    pub async fn delete_all_for(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1 OR {} = ?1",
            self.table(),
            self.first(),
            self.second()
        );
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;

        debug!(table = %self.table(), id, removed = result.rows_affected(), "Cleared associations");
        Ok(result.rows_affected())
    }

    /// The other id of every pair containing `id`, ordered by that id.
    pub async fn find_partner_ids_of(
        &self,
        conn: &mut SqliteConnection,
        id: EntityId,
    ) -> Result<Vec<EntityId>> {
        let sql = format!(
            r#"
            SELECT CASE WHEN {f} = ?1 THEN {s} ELSE {f} END AS partner
            FROM {table}
            WHERE {f} = ?1 OR {s} = ?1
            ORDER BY partner
            "#,
            table = self.table(),
            f = self.first(),
            s = self.second()
        );
        let rows: Vec<(EntityId,)> = sqlx::query_as(&sql).bind(id).fetch_all(&mut *conn).await?;

        Ok(rows.into_iter().map(|(partner,)| partner).collect())
    }

    /// Number of pairs containing `id`
    pub async fn count_for(&self, conn: &mut SqliteConnection, id: EntityId) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1 OR {} = ?1",
            self.table(),
            self.first(),
            self.second()
        );
        let row: (i64,) = sqlx::query_as(&sql).bind(id).fetch_one(&mut *conn).await?;
        Ok(row.0)
    }

    /// Total number of stored pairs
    pub async fn count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table());
        let row: (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(row.0)
    }
}
