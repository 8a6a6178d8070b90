use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use super::model::Model;
use crate::table::TableName;

static MAX_BIND_VALUES: usize = 32766;

fn column_list(columns: &[&str]) -> String {
    columns.join(", ")
}

fn all_columns<M: Model>() -> String {
    column_list(&[M::KEY_COLUMNS, M::COLUMNS].concat())
}

/// Inserts every item, split into statements that stay under the bind limit.
pub async fn bulk_create<M: Model>(conn: &mut SqliteConnection, items: &[M]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let bind_count = M::KEY_COLUMNS.len() + M::COLUMNS.len();
    let chunk_size = (MAX_BIND_VALUES / bind_count).max(1);
    for chunk in items.chunks(chunk_size) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", M::TABLE, all_columns::<M>()));
        qb.push_values(chunk, |mut row, item| {
            item.push_key(&mut row);
            item.push_fields(&mut row);
        });

        qb.build()
            .execute(&mut *conn)
            .await
            .with_context(|| format!("bulk insert into {} failed", M::TABLE))?;
    }

    debug!(table = %M::TABLE, count = items.len(), "bulk insert");
    Ok(())
}

/// Looks up the stored row sharing `item`'s primary key.
pub async fn get<M: Model>(conn: &mut SqliteConnection, item: &M) -> Result<Option<M>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE ({}) = (",
        all_columns::<M>(),
        M::TABLE,
        column_list(M::KEY_COLUMNS)
    ));
    item.push_key(&mut qb.separated(", "));
    qb.push(")");

    let found = qb
        .build_query_as::<M>()
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("lookup in {} failed", M::TABLE))?;
    Ok(found)
}

/// Returns the keys of `items` that are already stored.
pub async fn existing_keys<M: Model>(
    conn: &mut SqliteConnection,
    items: &[M],
) -> Result<HashSet<M::Key>> {
    let mut found = HashSet::with_capacity(items.len());
    if items.is_empty() {
        return Ok(found);
    }

    let keys = column_list(M::KEY_COLUMNS);
    let chunk_size = (MAX_BIND_VALUES / M::KEY_COLUMNS.len()).max(1);
    for chunk in items.chunks(chunk_size) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {keys} FROM {} WHERE ({keys}) IN (",
            M::TABLE
        ));
        qb.push_values(chunk, |mut row, item| item.push_key(&mut row));
        qb.push(")");

        let rows = qb
            .build()
            .fetch_all(&mut *conn)
            .await
            .with_context(|| format!("membership query on {} failed", M::TABLE))?;
        for row in &rows {
            found.insert(M::key_from_row(row)?);
        }
    }

    Ok(found)
}

/// Overwrites every non-key column of the stored row with `item`'s values.
///
/// Fails when no row carries `item`'s key.
pub async fn force_update<M: Model>(conn: &mut SqliteConnection, item: &M) -> Result<()> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "UPDATE {} SET ({}) = (",
        M::TABLE,
        column_list(M::COLUMNS)
    ));
    item.push_fields(&mut qb.separated(", "));
    qb.push(format!(") WHERE ({}) = (", column_list(M::KEY_COLUMNS)));
    item.push_key(&mut qb.separated(", "));
    qb.push(")");

    let done = qb
        .build()
        .execute(&mut *conn)
        .await
        .with_context(|| format!("forced update of {} {:?} failed", M::TABLE, item.pk()))?;
    if done.rows_affected() == 0 {
        bail!(
            "forced update of {} {:?} did not affect any rows",
            M::TABLE,
            item.pk()
        );
    }

    Ok(())
}

/// Force-updates every item inside one transaction (a savepoint when `conn`
/// is already inside one). Nothing is kept if any update fails.
pub async fn update_all<M: Model>(conn: &mut SqliteConnection, items: &[M]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    let mut tx = conn.begin().await?;
    for item in items {
        if let Err(err) = force_update(&mut tx, item).await {
            debug!(table = %M::TABLE, count = items.len(), "rolling back batch update");
            tx.rollback().await?;
            return Err(err);
        }
    }
    tx.commit().await?;

    debug!(table = %M::TABLE, count = items.len(), "batch update");
    Ok(())
}

pub async fn truncate(conn: &mut SqliteConnection, table: TableName) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {table}"))
        .execute(&mut *conn)
        .await
        .with_context(|| format!("truncating {table} failed"))?;
    Ok(())
}
