//! Bulk loading and incremental updating of a FIAS address database.

pub mod sync;
pub mod table;

#[cfg(test)]
mod testing;
