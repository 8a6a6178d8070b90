use std::io::Write;
use std::pin::pin;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use sqlx::SqliteConnection;
use tracing::info;

use super::model::Model;
use super::progress::{Counters, LoadingBar};
use super::strategy::Strategy;
use super::table_list::SourceError;
use super::validators::Validators;
use crate::table::Table;

type ProgressOutput = Arc<dyn Fn() -> Box<dyn Write + Send> + Send + Sync>;

/// Streams a table's records, validates them and hands the valid ones to a
/// flush strategy in batches of `limit`.
pub struct TableLoader {
    limit: u64,
    today: NaiveDate,
    strategy: Strategy,
    validators: Validators,
    progress: Option<ProgressOutput>,
}

impl TableLoader {
    /// `today` is the reference date every validation of this loader uses.
    pub fn new(limit: u64, today: NaiveDate, strategy: Strategy) -> Self {
        TableLoader {
            limit: limit.max(1),
            today,
            strategy,
            validators: Validators::fias(),
            progress: None,
        }
    }

    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    /// Sends progress lines to a fresh writer from `output` per table
    /// instead of stderr.
    pub fn with_progress<F>(mut self, output: F) -> Self
    where
        F: Fn() -> Box<dyn Write + Send> + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(output));
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// A record without a key never reaches the validators.
    pub fn validate<M: Model>(&self, item: &M) -> bool {
        item.pk().is_some() && self.validators.validate(item, self.today)
    }

    pub async fn load<M: Model>(
        &self,
        conn: &mut SqliteConnection,
        table: &Table,
    ) -> Result<Counters> {
        if M::TABLE != table.name.as_str() {
            bail!(
                "{} rows cannot be loaded into {}",
                table.filename,
                M::TABLE
            );
        }

        info!(
            "Loading table `{}` from {} with limit {} ({:?})",
            table.name, table.filename, self.limit, self.strategy
        );
        let rows = table.rows::<M>().await?;
        self.load_rows(conn, table, rows).await
    }

    pub async fn load_rows<M, S>(
        &self,
        conn: &mut SqliteConnection,
        table: &Table,
        rows: S,
    ) -> Result<Counters>
    where
        M: Model,
        S: Stream<Item = Result<Option<M>, SourceError>>,
    {
        let mut bar = match &self.progress {
            Some(output) => LoadingBar::new(table, output(), false),
            None => LoadingBar::stderr(table),
        };
        let mut flush = self.strategy.flusher::<M>(self.limit);
        let mut counters = Counters::default();

        let mut rows = pin!(rows);
        while let Some(item) = rows.next().await {
            let Some(item) = item?.filter(|item| self.validate(item)) else {
                counters.skipped += 1;
                continue;
            };

            if flush.accept(conn, item, &mut counters).await? {
                bar.update(counters.loaded, counters.updated, counters.skipped);
            }
        }

        if flush.drain(conn, &mut counters).await? {
            bar.update(counters.loaded, counters.updated, counters.skipped);
        }
        bar.update(counters.loaded, counters.updated, counters.skipped);
        bar.finish();

        Ok(counters)
    }
}
