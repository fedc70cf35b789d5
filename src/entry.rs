//! Entry definitions
//!
//! Defines the record contract every table row must satisfy: a plain,
//! fixed-layout POD value whose first field is an [`EntryHeader`]
//! (identifier + flags). Records are copied by raw bytes, never held by
//! reference, so a table can store them type-erased at a fixed stride.

use bytemuck::{Pod, Zeroable};

/// Size of the reserved header at the start of every record, in bytes
pub const HEADER_SIZE: usize = std::mem::size_of::<EntryHeader>();

/// Slot is occupied by a live record
pub const FLAG_OCCUPIED: u32 = 1 << 0;

/// Slot was modified since the last full or dirty-mode save
pub const FLAG_DIRTY: u32 = 1 << 1;

/// Stable logical identifier for an occupied slot within one table.
///
/// An `EntryId` is an index abstraction, not a pointer: it survives table
/// growth and buffer relocation. It is unique only within its table.
///
/// **Recycling hazard**: ids carry no generation tag. After `delete(id)`,
/// a later insert may hand out the same id for an unrelated record, so a
/// caller holding an id across a delete+insert cycle can silently read the
/// wrong record. Treat ids as invalidated by `delete`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
pub struct EntryId(pub u32);

impl EntryId {
    /// Sentinel marking "no such entry"
    pub const INVALID: EntryId = EntryId(u32::MAX);

    /// True unless this is the `INVALID` sentinel
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Slot index this id addresses
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reserved first fields of every record: identifier + flag bits.
///
/// The store stamps both on insert; caller-supplied values are overwritten.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct EntryHeader {
    /// Identifier assigned by the table on insert
    pub id: EntryId,
    /// `FLAG_*` bits maintained by the table
    pub flags: u32,
}

impl EntryHeader {
    pub fn occupied(&self) -> bool {
        self.flags & FLAG_OCCUPIED != 0
    }

    pub fn dirty(&self) -> bool {
        self.flags & FLAG_DIRTY != 0
    }
}

/// Contract for concrete record types stored in a table.
///
/// Implementors must be `#[repr(C)]` with an [`EntryHeader`] as their first
/// field; the `Pod` bound guarantees a fixed layout with no padding-derived
/// undefined bytes and no reference semantics. A type that cannot place the
/// header first simply cannot implement the accessors, so violations are a
/// compile failure rather than a runtime surprise. Every store call still
/// re-checks size/alignment against the table at runtime as defense in
/// depth, since a table's layout is fixed at creation while each call site
/// re-supplies the type.
///
/// ```
/// use bytemuck::{Pod, Zeroable};
/// use memdb::{EntryHeader, Record};
///
/// #[repr(C)]
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// struct Monster {
///     header: EntryHeader,
///     level: u32,
///     hp: u32,
/// }
///
/// impl Record for Monster {
///     fn header(&self) -> &EntryHeader { &self.header }
///     fn header_mut(&mut self) -> &mut EntryHeader { &mut self.header }
/// }
/// ```
pub trait Record: Pod {
    /// The reserved identifier+flags field (must be first in the layout)
    fn header(&self) -> &EntryHeader;

    /// Mutable access to the reserved header
    fn header_mut(&mut self) -> &mut EntryHeader;

    /// Identifier stamped into this record by the store
    fn id(&self) -> EntryId {
        self.header().id
    }
}

// =============================================================================
// Raw Header Access
// =============================================================================
// The table stores records type-erased, so header reads/writes go through
// the first HEADER_SIZE bytes of a slot. Unaligned reads keep the raw byte
// buffer free of alignment obligations.

/// Read the header out of a slot's raw bytes
pub(crate) fn header_of(slot: &[u8]) -> EntryHeader {
    bytemuck::pod_read_unaligned(&slot[..HEADER_SIZE])
}

/// Write the header into a slot's raw bytes
pub(crate) fn write_header(slot: &mut [u8], header: EntryHeader) {
    slot[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
}

/// Set or clear flag bits on a slot's header in place
pub(crate) fn update_flags(slot: &mut [u8], set: u32, clear: u32) {
    let mut header = header_of(slot);
    header.flags = (header.flags & !clear) | set;
    write_header(slot, header);
}
