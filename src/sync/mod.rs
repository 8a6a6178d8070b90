use std::path::Path;

use anyhow::Result;
use sqlx::SqliteConnection;
use tracing::info;

use crate::table::{Table, TableName};
use models::{AddrObj, House, SocrBase};

pub use loader::TableLoader;
pub use progress::Counters;
pub use strategy::{Flush, Strategy};
pub use table_list::{SourceError, TableList};
pub use validators::Validators;

mod loader;
pub mod model;
pub mod models;
mod nullable;
pub mod progress;
pub mod store;
mod strategy;
mod table_list;
mod validators;

/// Empties the listed tables, then fills them from the table list at `path`.
pub async fn load_complete_data(
    conn: &mut SqliteConnection,
    loader: &TableLoader,
    path: &Path,
    tables: &[TableName],
) -> Result<Vec<(Table, Counters)>> {
    let tablelist = TableList::open(path)?;
    info!("Loading complete data from {}", tablelist.path.display());

    for name in tables {
        if tablelist.tables(&[*name]).next().is_some() {
            info!("Truncating table `{}`", name);
            store::truncate(conn, *name).await?;
        }
    }

    load_tables(conn, loader, &tablelist, tables).await
}

/// Applies the table list at `path` on top of what is stored.
pub async fn update_data(
    conn: &mut SqliteConnection,
    loader: &TableLoader,
    path: &Path,
    tables: &[TableName],
) -> Result<Vec<(Table, Counters)>> {
    let tablelist = TableList::open(path)?;
    info!("Updating data from {}", tablelist.path.display());
    load_tables(conn, loader, &tablelist, tables).await
}

async fn load_tables(
    conn: &mut SqliteConnection,
    loader: &TableLoader,
    tablelist: &TableList,
    tables: &[TableName],
) -> Result<Vec<(Table, Counters)>> {
    let mut done = Vec::new();
    for table in tablelist.tables(tables) {
        let counters = match table.name {
            TableName::Socrbase => loader.load::<SocrBase>(conn, table).await?,
            TableName::Addrobj => loader.load::<AddrObj>(conn, table).await?,
            TableName::House => loader.load::<House>(conn, table).await?,
        };
        done.push((table.clone(), counters));
    }

    Ok(done)
}
