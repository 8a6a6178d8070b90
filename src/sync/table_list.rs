use std::path::{Path, PathBuf};

use async_compression::tokio::bufread::GzipDecoder;
use csv_async::{AsyncReaderBuilder, ErrorKind};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::io::{AsyncRead, BufReader};
use tracing::{debug, warn};

use super::model::Model;
use crate::table::{Table, TableName};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} holds no FIAS table files", .0.display())]
    NoTables(PathBuf),
    #[error("{} is not a valid table file: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: csv_async::Error,
    },
}

/// Decoded rows of one table file. `None` marks a row that failed to decode.
pub type Rows<M> = BoxStream<'static, Result<Option<M>, SourceError>>;

/// A directory of `AS_<TABLE>_*.tsv[.gz]` files, or one such file.
#[derive(Debug)]
pub struct TableList {
    pub path: PathBuf,
    tables: Vec<Table>,
}

impl TableList {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let unreadable = |source| SourceError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let meta = std::fs::metadata(path).map_err(unreadable)?;
        let files = if meta.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path).map_err(unreadable)? {
                files.push(entry.map_err(unreadable)?.path());
            }
            files
        } else {
            vec![path.to_path_buf()]
        };

        let mut tables: Vec<Table> = files
            .into_iter()
            .filter_map(|file| Some(Table::new(table_name_of(&file)?, file)))
            .collect();
        if tables.is_empty() {
            return Err(SourceError::NoTables(path.to_path_buf()));
        }

        tables.sort_by_key(|table| (load_order(table.name), table.filename.clone()));
        debug!(path = %path.display(), tables = tables.len(), "opened table list");

        Ok(TableList {
            path: path.to_path_buf(),
            tables,
        })
    }

    /// Table files for `names`, in load order.
    pub fn tables<'a>(&'a self, names: &'a [TableName]) -> impl Iterator<Item = &'a Table> + 'a {
        self.tables
            .iter()
            .filter(move |table| names.contains(&table.name))
    }
}

fn load_order(name: TableName) -> usize {
    TableName::ALL
        .iter()
        .position(|n| *n == name)
        .unwrap_or(usize::MAX)
}

fn table_name_of(path: &Path) -> Option<TableName> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name
        .strip_suffix(".gz")
        .unwrap_or(file_name)
        .strip_suffix(".tsv")?;

    let mut parts = stem.split('_');
    if !parts.next()?.eq_ignore_ascii_case("as") {
        return None;
    }
    TableName::from_file_part(parts.next()?)
}

impl Table {
    /// Opens the table file and streams its rows in file order.
    ///
    /// Rows that fail to decode come through as `None`. A read error, such
    /// as a truncated gzip member, comes through as `SourceError::Corrupt`.
    pub async fn rows<M: Model>(&self) -> Result<Rows<M>, SourceError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| SourceError::Unreadable {
                path: self.path.clone(),
                source,
            })?;

        let input: Box<dyn AsyncRead + Unpin + Send> =
            if self.path.extension().is_some_and(|ext| ext == "gz") {
                Box::new(GzipDecoder::new(BufReader::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };

        let mut reader = AsyncReaderBuilder::new()
            .delimiter(b'\t')
            .create_reader(input);
        let headers = reader
            .headers()
            .await
            .map_err(|source| SourceError::Corrupt {
                path: self.path.clone(),
                source,
            })?
            .clone();

        let path = self.path.clone();
        let filename = self.filename.clone();
        let rows = reader.into_records().map(move |row| {
            match row.and_then(|row| row.deserialize::<M>(Some(&headers))) {
                Ok(item) => Ok(Some(item)),
                Err(err) if is_row_error(&err) => {
                    warn!(file = %filename, error = %err, "Ignoring row that failed to parse");
                    Ok(None)
                }
                Err(source) => Err(SourceError::Corrupt {
                    path: path.clone(),
                    source,
                }),
            }
        });

        Ok(rows.boxed())
    }
}

/// Errors confined to one record. Anything else means the file itself is bad.
fn is_row_error(err: &csv_async::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::Deserialize { .. } | ErrorKind::Utf8 { .. } | ErrorKind::UnequalLengths { .. }
    )
}
