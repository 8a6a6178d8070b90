use std::io::{self, IsTerminal, Write};

use tracing::{debug, info};

use crate::table::{Table, TableName};

/// Running totals of one `load` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub loaded: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// Single status line per table, re-rendered on every update.
///
/// `update` overwrites counters rather than adding to them, so callers pass
/// cumulative totals. A zero argument leaves its counter alone.
pub struct LoadingBar {
    table: TableName,
    filename: String,
    counters: Counters,
    out: Box<dyn Write + Send>,
    in_place: bool,
}

impl LoadingBar {
    /// Writes to stderr, redrawing in place when stderr is a terminal.
    pub fn stderr(table: &Table) -> Self {
        let in_place = io::stderr().is_terminal();
        Self::new(table, Box::new(io::stderr()), in_place)
    }

    pub fn new(table: &Table, out: Box<dyn Write + Send>, in_place: bool) -> Self {
        LoadingBar {
            table: table.name,
            filename: table.filename.clone(),
            counters: Counters::default(),
            out,
            in_place,
        }
    }

    pub fn update(&mut self, loaded: u64, updated: u64, skipped: u64) {
        if loaded != 0 {
            self.counters.loaded = loaded;
        }
        if updated != 0 {
            self.counters.updated = updated;
        }
        if skipped != 0 {
            self.counters.skipped = skipped;
        }

        debug!(
            table = %self.table,
            loaded = self.counters.loaded,
            updated = self.counters.updated,
            skipped = self.counters.skipped,
            "progress"
        );

        let line = self.line();
        // progress output never fails the run
        if self.in_place {
            write!(self.out, "\r\x1b[K{line}").ok();
        } else {
            writeln!(self.out, "{line}").ok();
        }
        self.out.flush().ok();
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn finish(mut self) -> Counters {
        if self.in_place {
            writeln!(self.out).ok();
            self.out.flush().ok();
        }

        info!(
            table = %self.table,
            file = %self.filename,
            loaded = self.counters.loaded,
            updated = self.counters.updated,
            skipped = self.counters.skipped,
            "table done"
        );
        self.counters()
    }

    fn line(&self) -> String {
        format!(
            "Table: {}. Loaded: {} | Updated: {} | Skipped:  {} \t\t\tFilename: {}",
            self.table,
            self.counters.loaded,
            self.counters.updated,
            self.counters.skipped,
            self.filename
        )
    }
}
