use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::sync::model::{Model, Values};
use crate::sync::nullable::nullable;
use crate::table::TableName;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, FromRow)]
pub struct House {
    #[serde(deserialize_with = "nullable")]
    pub houseid: Option<String>,
    pub houseguid: String,
    pub aoguid: String,
    #[serde(deserialize_with = "nullable")]
    pub housenum: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub buildnum: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub strucnum: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub postalcode: Option<String>,
    pub startdate: NaiveDate,
    pub enddate: NaiveDate,
    pub updatedate: NaiveDate,
}

impl Model for House {
    type Key = String;

    const TABLE: &'static str = TableName::House.as_str();
    const KEY_COLUMNS: &'static [&'static str] = &["houseid"];
    const COLUMNS: &'static [&'static str] = &[
        "houseguid",
        "aoguid",
        "housenum",
        "buildnum",
        "strucnum",
        "postalcode",
        "startdate",
        "enddate",
        "updatedate",
    ];

    fn pk(&self) -> Option<String> {
        self.houseid.clone()
    }

    fn key_from_row(row: &SqliteRow) -> sqlx::Result<String> {
        row.try_get("houseid")
    }

    fn push_key(&self, values: &mut Values<'_, '_>) {
        values.push_bind(self.houseid.clone());
    }

    fn push_fields(&self, values: &mut Values<'_, '_>) {
        values
            .push_bind(self.houseguid.clone())
            .push_bind(self.aoguid.clone())
            .push_bind(self.housenum.clone())
            .push_bind(self.buildnum.clone())
            .push_bind(self.strucnum.clone())
            .push_bind(self.postalcode.clone())
            .push_bind(self.startdate)
            .push_bind(self.enddate)
            .push_bind(self.updatedate);
    }
}
