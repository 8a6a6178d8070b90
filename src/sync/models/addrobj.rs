use chrono::NaiveDate;
use serde::Deserialize;
use serde_with::serde_as;
use serde_with::BoolFromInt;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::sync::model::{Model, Values};
use crate::sync::nullable::nullable;
use crate::table::TableName;

/// One version of an address object (region, city, street, ...). `aoid`
/// identifies the version, `aoguid` the object across versions.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, FromRow)]
pub struct AddrObj {
    #[serde(deserialize_with = "nullable")]
    pub aoid: Option<String>,
    pub aoguid: String,
    #[serde(deserialize_with = "nullable")]
    pub parentguid: Option<String>,
    pub formalname: String,
    #[serde(deserialize_with = "nullable")]
    pub offname: Option<String>,
    pub shortname: String,
    pub aolevel: i32,
    pub regioncode: String,
    #[serde(deserialize_with = "nullable")]
    pub postalcode: Option<String>,
    pub actstatus: i32,
    #[serde_as(as = "BoolFromInt")]
    pub livestatus: bool,
    pub startdate: NaiveDate,
    pub enddate: NaiveDate,
    pub updatedate: NaiveDate,
}

impl Model for AddrObj {
    type Key = String;

    const TABLE: &'static str = TableName::Addrobj.as_str();
    const KEY_COLUMNS: &'static [&'static str] = &["aoid"];
    const COLUMNS: &'static [&'static str] = &[
        "aoguid",
        "parentguid",
        "formalname",
        "offname",
        "shortname",
        "aolevel",
        "regioncode",
        "postalcode",
        "actstatus",
        "livestatus",
        "startdate",
        "enddate",
        "updatedate",
    ];

    fn pk(&self) -> Option<String> {
        self.aoid.clone()
    }

    fn key_from_row(row: &SqliteRow) -> sqlx::Result<String> {
        row.try_get("aoid")
    }

    fn push_key(&self, values: &mut Values<'_, '_>) {
        values.push_bind(self.aoid.clone());
    }

    fn push_fields(&self, values: &mut Values<'_, '_>) {
        values
            .push_bind(self.aoguid.clone())
            .push_bind(self.parentguid.clone())
            .push_bind(self.formalname.clone())
            .push_bind(self.offname.clone())
            .push_bind(self.shortname.clone())
            .push_bind(self.aolevel)
            .push_bind(self.regioncode.clone())
            .push_bind(self.postalcode.clone())
            .push_bind(self.actstatus)
            .push_bind(self.livestatus)
            .push_bind(self.startdate)
            .push_bind(self.enddate)
            .push_bind(self.updatedate);
    }
}
