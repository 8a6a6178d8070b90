use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use sqlx::query_builder::Separated;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Sqlite};

/// Bound values of one row inside a query being built.
pub type Values<'qb, 'args> = Separated<'qb, 'args, Sqlite, &'static str>;

/// A record type that can be read from a table file and written to its table.
///
/// Rows decode from the table file with serde and from the store with
/// `FromRow`, so field names double as column names.
pub trait Model:
    DeserializeOwned + for<'r> FromRow<'r, SqliteRow> + Debug + Send + Sync + Unpin + 'static
{
    type Key: Eq + Hash + Debug + Send + Sync;

    /// Store table the records are written to.
    const TABLE: &'static str;
    /// Primary key columns, in bind order.
    const KEY_COLUMNS: &'static [&'static str];
    /// Every other column, in bind order.
    const COLUMNS: &'static [&'static str];

    /// `None` when any key column is unset.
    fn pk(&self) -> Option<Self::Key>;

    fn key_from_row(row: &SqliteRow) -> sqlx::Result<Self::Key>;

    /// Binds the key columns, matching `KEY_COLUMNS`.
    fn push_key(&self, values: &mut Values<'_, '_>);

    /// Binds the remaining columns, matching `COLUMNS`.
    fn push_fields(&self, values: &mut Values<'_, '_>);
}
