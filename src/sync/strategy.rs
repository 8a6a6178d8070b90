use std::collections::HashSet;
use std::mem;

use anyhow::Result;
use itertools::{Either, Itertools};
use sqlx::SqliteConnection;
use tracing::debug;

use super::model::Model;
use super::progress::Counters;
use super::store;

/// How a batch of validated records reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Bulk-insert every record.
    InsertOnly,
    /// Look up each record; batch the new ones, force-update the others
    /// one by one.
    CheckThenAct,
    /// One membership query per batch, then a bulk insert and a
    /// transactional update.
    Partitioned,
}

impl Strategy {
    /// `limit` must be at least 1.
    pub fn flusher<M: Model>(self, limit: u64) -> Box<dyn Flush<M>> {
        match self {
            Strategy::InsertOnly => Box::new(InsertOnly::new(limit)),
            Strategy::CheckThenAct => Box::new(CheckThenAct::new(limit)),
            Strategy::Partitioned => Box::new(Partitioned::new(limit)),
        }
    }
}

#[async_trait::async_trait]
pub trait Flush<M: Model>: Send {
    /// Takes one validated record. Returns `true` when progress is due.
    async fn accept(
        &mut self,
        conn: &mut SqliteConnection,
        item: M,
        counters: &mut Counters,
    ) -> Result<bool>;

    /// Writes what is still batched once the stream ends. Returns `true`
    /// when anything was written.
    async fn drain(
        &mut self,
        conn: &mut SqliteConnection,
        counters: &mut Counters,
    ) -> Result<bool>;
}

pub struct InsertOnly<M> {
    limit: u64,
    batch: Vec<M>,
}

impl<M: Model> InsertOnly<M> {
    pub fn new(limit: u64) -> Self {
        InsertOnly {
            limit,
            batch: Vec::with_capacity(limit as usize),
        }
    }
}

#[async_trait::async_trait]
impl<M: Model> Flush<M> for InsertOnly<M> {
    async fn accept(
        &mut self,
        conn: &mut SqliteConnection,
        item: M,
        counters: &mut Counters,
    ) -> Result<bool> {
        self.batch.push(item);
        counters.loaded += 1;

        if counters.loaded % self.limit == 0 {
            store::bulk_create(conn, &self.batch).await?;
            self.batch.clear();
            return Ok(true);
        }
        Ok(false)
    }

    async fn drain(
        &mut self,
        conn: &mut SqliteConnection,
        _counters: &mut Counters,
    ) -> Result<bool> {
        if self.batch.is_empty() {
            return Ok(false);
        }
        store::bulk_create(conn, &self.batch).await?;
        self.batch.clear();
        Ok(true)
    }
}

/// One lookup per record. Updates are forced as soon as a stored row turns
/// up and are not wrapped in a transaction. New records go through an
/// insert-only batch.
pub struct CheckThenAct<M> {
    update_limit: u64,
    inserts: InsertOnly<M>,
}

impl<M: Model> CheckThenAct<M> {
    pub fn new(limit: u64) -> Self {
        CheckThenAct {
            update_limit: (limit / 10).max(1),
            inserts: InsertOnly::new(limit),
        }
    }
}

#[async_trait::async_trait]
impl<M: Model> Flush<M> for CheckThenAct<M> {
    async fn accept(
        &mut self,
        conn: &mut SqliteConnection,
        item: M,
        counters: &mut Counters,
    ) -> Result<bool> {
        if store::get(conn, &item).await?.is_some() {
            store::force_update(conn, &item).await?;
            counters.updated += 1;
            return Ok(counters.updated % self.update_limit == 0);
        }

        self.inserts.accept(conn, item, counters).await
    }

    async fn drain(
        &mut self,
        conn: &mut SqliteConnection,
        counters: &mut Counters,
    ) -> Result<bool> {
        self.inserts.drain(conn, counters).await
    }
}

/// Defers the new-or-existing decision to the whole batch.
pub struct Partitioned<M> {
    limit: u64,
    batch: Vec<M>,
    counter: u64,
}

impl<M: Model> Partitioned<M> {
    pub fn new(limit: u64) -> Self {
        Partitioned {
            limit,
            batch: Vec::with_capacity(limit as usize),
            counter: 0,
        }
    }

    async fn flush(
        &mut self,
        conn: &mut SqliteConnection,
        counters: &mut Counters,
    ) -> Result<()> {
        let batch = mem::replace(&mut self.batch, Vec::with_capacity(self.limit as usize));
        let existing = store::existing_keys(conn, &batch).await?;
        let (new, exists) = split(batch, &existing);
        debug!(
            table = %M::TABLE,
            new = new.len(),
            existing = exists.len(),
            "partitioned batch"
        );

        store::bulk_create(conn, &new).await?;
        store::update_all(conn, &exists).await?;

        counters.loaded += new.len() as u64;
        counters.updated += exists.len() as u64;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<M: Model> Flush<M> for Partitioned<M> {
    async fn accept(
        &mut self,
        conn: &mut SqliteConnection,
        item: M,
        counters: &mut Counters,
    ) -> Result<bool> {
        self.batch.push(item);
        self.counter += 1;

        if self.counter % self.limit == 0 {
            self.flush(conn, counters).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn drain(
        &mut self,
        conn: &mut SqliteConnection,
        counters: &mut Counters,
    ) -> Result<bool> {
        if self.batch.is_empty() {
            return Ok(false);
        }
        self.flush(conn, counters).await?;
        Ok(true)
    }
}

/// Splits a batch into records whose key is not stored yet and records
/// whose key is, keeping stream order inside each half.
pub fn split<M: Model>(batch: Vec<M>, existing: &HashSet<M::Key>) -> (Vec<M>, Vec<M>) {
    batch.into_iter().partition_map(|item| match item.pk() {
        Some(key) if existing.contains(&key) => Either::Right(item),
        _ => Either::Left(item),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::models::SocrBase;
    use crate::testing::{memory_db, socr};

    #[test]
    fn test_split_is_complete_and_disjoint() {
        let batch: Vec<SocrBase> = (0..10).map(|i| socr(i, "ул")).collect();
        let existing = HashSet::from([1, 4, 5, 9, 42]);

        let (new, exists) = split(batch, &existing);

        assert_eq!(new.len() + exists.len(), 10);
        let new_keys: Vec<i64> = new.iter().filter_map(Model::pk).collect();
        let existing_keys: Vec<i64> = exists.iter().filter_map(Model::pk).collect();
        assert_eq!(new_keys, vec![0, 2, 3, 6, 7, 8]);
        assert_eq!(existing_keys, vec![1, 4, 5, 9]);
    }

    #[test]
    fn test_update_limit_is_a_tenth_of_limit() {
        assert_eq!(CheckThenAct::<SocrBase>::new(10_000).update_limit, 1_000);
        assert_eq!(CheckThenAct::<SocrBase>::new(5).update_limit, 1);
    }

    #[tokio::test]
    async fn test_insert_only_flushes_at_multiples_of_limit() {
        let mut conn = memory_db().await;
        let mut flush = Strategy::InsertOnly.flusher::<SocrBase>(3);
        let mut counters = Counters::default();

        let mut due = Vec::new();
        for i in 0..7 {
            let item = socr(i, "ул");
            due.push(flush.accept(&mut conn, item, &mut counters).await.unwrap());
        }
        assert_eq!(due, vec![false, false, true, false, false, true, false]);
        assert!(flush.drain(&mut conn, &mut counters).await.unwrap());
        assert!(!flush.drain(&mut conn, &mut counters).await.unwrap());
        assert_eq!(counters.loaded, 7);
    }

    #[tokio::test]
    async fn test_partitioned_empty_remainder_does_nothing() {
        let mut conn = memory_db().await;
        let mut flush = Strategy::Partitioned.flusher::<SocrBase>(2);
        let mut counters = Counters::default();

        flush.accept(&mut conn, socr(1, "ул"), &mut counters).await.unwrap();
        assert!(flush.accept(&mut conn, socr(2, "ул"), &mut counters).await.unwrap());
        assert!(!flush.drain(&mut conn, &mut counters).await.unwrap());
        assert_eq!(
            counters,
            Counters {
                loaded: 2,
                updated: 0,
                skipped: 0
            }
        );
    }
}
