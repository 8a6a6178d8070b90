use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;

/// FIAS tables this loader knows how to fill, in load order.
#[derive(ValueEnum, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Socrbase,
    Addrobj,
    House,
}

impl TableName {
    pub const ALL: [TableName; 3] = [TableName::Socrbase, TableName::Addrobj, TableName::House];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TableName::Socrbase => "socrbase",
            TableName::Addrobj => "addrobj",
            TableName::House => "house",
        }
    }

    /// Matches the `<TABLE>` part of an `AS_<TABLE>_...` file name.
    pub fn from_file_part(part: &str) -> Option<Self> {
        TableName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(part))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table file of a table list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: TableName,
    pub filename: String,
    pub path: PathBuf,
}

impl Table {
    pub fn new(name: TableName, path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        Table {
            name,
            filename,
            path,
        }
    }
}
