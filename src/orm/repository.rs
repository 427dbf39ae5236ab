//! Generic entity lookups by primary key
//!
//! All functions take the connection to run on, so they work both on a
//! pooled connection and inside a transaction (`&mut *tx`).

use sqlx::{Row, SqliteConnection};

use super::{DatabaseEntity, EntityId, FromSqlRow};

/// Fetch one entity by primary key.
pub async fn find_by_id<E>(
    conn: &mut SqliteConnection,
    id: EntityId,
) -> Result<Option<E>, sqlx::Error>
where
    E: DatabaseEntity + FromSqlRow,
{
    let sql = format!("{} WHERE {} = ?1", E::select_sql(), E::PRIMARY_KEY);
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(E::from_row).transpose()
}

/// Fetch the entities with the given keys, in the order of `ids`.
///
/// Keys without a row are skipped; duplicate keys yield one entity each time
/// they appear.
pub async fn find_by_ids<E>(
    conn: &mut SqliteConnection,
    ids: &[EntityId],
) -> Result<Vec<E>, sqlx::Error>
where
    E: DatabaseEntity + FromSqlRow,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "{} WHERE {} IN ({})",
        E::select_sql(),
        E::PRIMARY_KEY,
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let mut ordered = Vec::with_capacity(ids.len());
    for id in ids {
        let row = rows
            .iter()
            .find(|r| r.try_get::<EntityId, _>(E::PRIMARY_KEY).ok() == Some(*id));
        if let Some(row) = row {
            ordered.push(E::from_row(row)?);
        }
    }

    Ok(ordered)
}

/// Count all rows of the entity's table.
pub async fn count<E: DatabaseEntity>(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE_NAME);
    let row: (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
    Ok(row.0)
}

/// Delete one row by primary key. Returns whether a row was removed.
pub async fn delete_by_id<E: DatabaseEntity>(
    conn: &mut SqliteConnection,
    id: EntityId,
) -> Result<bool, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE {} = ?1", E::TABLE_NAME, E::PRIMARY_KEY);
    let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}
