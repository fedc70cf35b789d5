//! Persistence Module
//!
//! Binary encode/decode of a table's occupied records, plus the
//! inversion-of-control sink that lets an external layer consume raw table
//! bytes in its own format.
//!
//! ## Snapshot File Format (V1)
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header                                       │
//! │ ┌──────────┬──────────┬──────────┬─────────┐ │
//! │ │Magic (4) │Version(2)│HdrLen (4)│ bincode │ │
//! │ └──────────┴──────────┴──────────┴─────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Record Section                               │
//! │ ┌────────────┬──────────────────────┐        │
//! │ │ EntryId(4) │ entry_size raw bytes │        │
//! │ └────────────┴──────────────────────┘        │
//! │ ... (repeated record_count times)            │
//! ├──────────────────────────────────────────────┤
//! │ Footer                                       │
//! │ ┌─────────────────────────┐                  │
//! │ │ CRC32 of record section │                  │
//! │ └─────────────────────────┘                  │
//! └──────────────────────────────────────────────┘
//! ```
//! The bincode header carries enough layout metadata to reject a reader
//! using a mismatched record type; the CRC is validated over the fully-read
//! record section before any record is committed to a live table.
//!
//! A non-full snapshot (dirty modes) contains only the records dirtied since
//! the previous save. It decodes with the same replace semantics as a full
//! one, so it is a complete image only if every record was dirtied since the
//! last full write.

mod reader;
mod sink;
mod writer;

pub use sink::EntryWriter;

pub(crate) use reader::{read_snapshot, Snapshot};
pub(crate) use sink::commit_table;
pub(crate) use writer::write_snapshot;

use serde::{Deserialize, Serialize};

/// File magic for table snapshots
pub(crate) const MAGIC: &[u8; 4] = b"MDBT";

/// Snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Which records a save emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Every occupied record
    Full,
    /// Records whose slot dirty flag is set (scan cost ∝ capacity)
    Dirty,
    /// Records on the accumulated dirty-id list (cost ∝ dirty count);
    /// preferred for large, sparsely-written tables
    DirtyList,
}

/// Layout metadata block at the head of every snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SnapshotHeader {
    pub table_name: String,
    pub entry_size: u32,
    pub entry_align: u32,
    pub capacity: u32,
    pub high_water: u32,
    pub record_count: u32,
}
