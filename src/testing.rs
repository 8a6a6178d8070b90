//! Fixtures shared by the unit tests.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, FromRow, Row, SqliteConnection};
use tokio::io::AsyncWriteExt;

use crate::sync::model::{Model, Values};
use crate::sync::models::{AddrObj, House, SocrBase};
use crate::sync::progress::Counters;
use crate::table::{Table, TableName};

/// In-memory database with the schema applied.
pub async fn memory_db() -> SqliteConnection {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&mut conn).await.unwrap();
    conn
}

/// In-memory database with an extra `house_versions` table keyed by
/// `(houseguid, startdate)`.
pub async fn versions_db() -> SqliteConnection {
    let mut conn = memory_db().await;
    sqlx::query(
        "CREATE TABLE house_versions (
            houseguid TEXT NOT NULL,
            startdate TEXT NOT NULL,
            housenum TEXT NOT NULL,
            enddate TEXT NOT NULL,
            PRIMARY KEY (houseguid, startdate)
        ) WITHOUT ROWID",
    )
    .execute(&mut conn)
    .await
    .unwrap();
    conn
}

/// Makes every update that would set `scname` to `value` fail.
pub async fn reject_updates_to(conn: &mut SqliteConnection, value: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER socrbase_reject BEFORE UPDATE ON socrbase \
         WHEN NEW.scname = '{value}' BEGIN SELECT RAISE(ABORT, 'rejected'); END"
    ))
    .execute(conn)
    .await
    .unwrap();
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn socr(key: i64, scname: &str) -> SocrBase {
    SocrBase {
        kod_t_st: Some(key),
        level: 7,
        scname: scname.to_string(),
        socrname: format!("type {key}"),
    }
}

pub fn addrobj(aoid: &str) -> AddrObj {
    AddrObj {
        aoid: Some(aoid.to_string()),
        aoguid: format!("guid-{aoid}"),
        parentguid: None,
        formalname: "Тверская".to_string(),
        offname: Some("Тверская".to_string()),
        shortname: "ул".to_string(),
        aolevel: 7,
        regioncode: "77".to_string(),
        postalcode: Some("125009".to_string()),
        actstatus: 1,
        livestatus: true,
        startdate: date("2011-09-13"),
        enddate: date("2079-06-06"),
        updatedate: date("2014-01-04"),
    }
}

pub fn house(houseid: &str) -> House {
    House {
        houseid: Some(houseid.to_string()),
        houseguid: format!("guid-{houseid}"),
        aoguid: "guid-a1".to_string(),
        housenum: Some("1".to_string()),
        buildnum: None,
        strucnum: None,
        postalcode: Some("125009".to_string()),
        startdate: date("2012-01-01"),
        enddate: date("2079-06-06"),
        updatedate: date("2014-01-04"),
    }
}

/// One dated version of a house, identified by guid and start date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, FromRow)]
pub struct HouseVersion {
    pub houseguid: Option<String>,
    pub startdate: NaiveDate,
    pub housenum: String,
    pub enddate: NaiveDate,
}

impl Model for HouseVersion {
    type Key = (String, NaiveDate);

    const TABLE: &'static str = "house_versions";
    const KEY_COLUMNS: &'static [&'static str] = &["houseguid", "startdate"];
    const COLUMNS: &'static [&'static str] = &["housenum", "enddate"];

    fn pk(&self) -> Option<Self::Key> {
        Some((self.houseguid.clone()?, self.startdate))
    }

    fn key_from_row(row: &SqliteRow) -> sqlx::Result<Self::Key> {
        Ok((row.try_get("houseguid")?, row.try_get("startdate")?))
    }

    fn push_key(&self, values: &mut Values<'_, '_>) {
        values
            .push_bind(self.houseguid.clone())
            .push_bind(self.startdate);
    }

    fn push_fields(&self, values: &mut Values<'_, '_>) {
        values
            .push_bind(self.housenum.clone())
            .push_bind(self.enddate);
    }
}

pub fn house_version(guid: &str, start: &str, housenum: &str) -> HouseVersion {
    HouseVersion {
        houseguid: Some(guid.to_string()),
        startdate: date(start),
        housenum: housenum.to_string(),
        enddate: date("2079-06-06"),
    }
}

pub fn socrbase_table() -> Table {
    Table::new(
        TableName::Socrbase,
        PathBuf::from("AS_SOCRBASE_20151112.tsv"),
    )
}

pub fn write_tsv(path: &Path, header: &str, rows: &[&str]) {
    let mut body = format!("{header}\n");
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    std::fs::write(path, body).unwrap();
}

/// Drops the last `n` bytes of the file at `path`.
pub fn cut_file(path: &Path, n: usize) {
    let bytes = std::fs::read(path).unwrap();
    std::fs::write(path, &bytes[..bytes.len() - n]).unwrap();
}

pub async fn write_gz(path: &Path, body: &str) {
    let file = tokio::fs::File::create(path).await.unwrap();
    let mut encoder = async_compression::tokio::write::GzipEncoder::new(file);
    encoder.write_all(body.as_bytes()).await.unwrap();
    encoder.shutdown().await.unwrap();
}

/// Progress sink whose output the test can read back.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text()
            .split(['\r', '\n'])
            .map(|line| line.trim_start_matches("\x1b[K"))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Counters of every rendered status line, in order.
    pub fn reports(&self) -> Vec<Counters> {
        self.lines()
            .iter()
            .map(|line| Counters {
                loaded: counter(line, "Loaded:"),
                updated: counter(line, "Updated:"),
                skipped: counter(line, "Skipped:"),
            })
            .collect()
    }
}

fn counter(line: &str, label: &str) -> u64 {
    let start = line.find(label).unwrap() + label.len();
    line[start..]
        .trim_start()
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap()
        .parse()
        .unwrap()
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
