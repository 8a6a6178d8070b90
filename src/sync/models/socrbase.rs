use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::sync::model::{Model, Values};
use crate::sync::nullable::nullable;
use crate::table::TableName;

/// Short names of address object types ("ул", "пер", ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, FromRow)]
pub struct SocrBase {
    #[serde(deserialize_with = "nullable")]
    pub kod_t_st: Option<i64>,
    pub level: i32,
    pub scname: String,
    pub socrname: String,
}

impl Model for SocrBase {
    type Key = i64;

    const TABLE: &'static str = TableName::Socrbase.as_str();
    const KEY_COLUMNS: &'static [&'static str] = &["kod_t_st"];
    const COLUMNS: &'static [&'static str] = &["level", "scname", "socrname"];

    fn pk(&self) -> Option<i64> {
        self.kod_t_st
    }

    fn key_from_row(row: &SqliteRow) -> sqlx::Result<i64> {
        row.try_get("kod_t_st")
    }

    fn push_key(&self, values: &mut Values<'_, '_>) {
        values.push_bind(self.kod_t_st);
    }

    fn push_fields(&self, values: &mut Values<'_, '_>) {
        values
            .push_bind(self.level)
            .push_bind(self.scname.clone())
            .push_bind(self.socrname.clone());
    }
}
