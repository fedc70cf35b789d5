//! Entry writer sink
//!
//! Inversion-of-control persistence: a caller-supplied sink receives a
//! table's raw record bytes and stores them in whatever format it likes,
//! without this crate knowing the destination. The sink is borrowed only
//! for the duration of one `Store::commit_dirty` call.

use crate::entry::EntryId;
use crate::error::{MemDbError, Result};
use crate::table::Table;

/// Caller-supplied destination for raw table bytes.
///
/// `Store::commit_dirty` drives the protocol: one `begin_commit`, then one
/// `commit` per selected record, then one `end_commit`. The byte offset of
/// each commit is `slot × entry_size` — the record's position in a whole
/// `capacity × entry_size` table image, the same layout
/// `Store::load_table_data` ingests.
pub trait EntryWriter {
    /// Announces the table image about to be committed
    fn begin_commit(&mut self, capacity: usize, entry_size: usize, entry_align: usize)
        -> Result<()>;

    /// One record's raw bytes at its byte offset within the table image
    fn commit(&mut self, bytes: &[u8], entry_align: usize, offset: usize) -> Result<()>;

    /// All selected records delivered
    fn end_commit(&mut self) -> Result<()>;
}

/// Drive an [`EntryWriter`] over the chosen records of a table
pub(crate) fn commit_table(table: &Table, sink: &mut dyn EntryWriter, ids: &[EntryId]) -> Result<()> {
    let entry_size = table.entry_size();
    let entry_align = table.entry_align();

    sink.begin_commit(table.capacity(), entry_size, entry_align)?;
    for &id in ids {
        let record = table.slot_bytes(id).ok_or_else(|| {
            MemDbError::Corruption(format!(
                "table '{}': commit set names freed entry {}",
                table.name(),
                id
            ))
        })?;
        sink.commit(record, entry_align, id.index() * entry_size)?;
    }
    sink.end_commit()
}
