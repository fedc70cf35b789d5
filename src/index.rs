//! Secondary index
//!
//! An ordered mapping from one numeric record field to the EntryIds holding
//! that value, kept consistent eagerly by every table mutation so indexed
//! reads never rebuild anything.
//!
//! ## Semantics
//! - Keys are [`NumericalVariant`]s read from a fixed byte offset of each
//!   record; the map is ordered by (type tag, value).
//! - With `allow_duplicates`, one key maps to many ids; the per-key list
//!   preserves insertion order, so point queries over duplicates always
//!   answer with the earliest-inserted match.
//! - `find_all` enumerates every id equal to the key. It is an equal-match
//!   query, not a numeric range scan.

use std::collections::BTreeMap;

use crate::entry::EntryId;
use crate::error::Result;
use crate::variant::{NumericalVariant, VariantKind};

/// Ordered value → ids structure over one field of one table
#[derive(Debug)]
pub struct Index {
    /// Field type tag
    kind: VariantKind,
    /// Byte offset of the field within each record
    offset: usize,
    /// Whether two records may share a key value
    allow_duplicates: bool,
    /// Key → ids in insertion order
    map: BTreeMap<NumericalVariant, Vec<EntryId>>,
}

impl Index {
    pub(crate) fn new(kind: VariantKind, offset: usize, allow_duplicates: bool) -> Self {
        Self {
            kind,
            offset,
            allow_duplicates,
            map: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> VariantKind {
        self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// True if this index is defined over the given (offset, kind) pair
    pub(crate) fn covers(&self, kind: VariantKind, offset: usize) -> bool {
        self.kind == kind && self.offset == offset
    }

    /// Extract this index's key from a record's raw bytes
    pub(crate) fn key_of(&self, record: &[u8]) -> Result<NumericalVariant> {
        self.kind.read(record, self.offset)
    }

    /// True if any record currently holds `key`
    pub(crate) fn contains(&self, key: &NumericalVariant) -> bool {
        self.map.contains_key(key)
    }

    /// Register `id` under `key`. Uniqueness was checked by the caller
    /// before any mutation, so this cannot fail.
    pub(crate) fn insert(&mut self, key: NumericalVariant, id: EntryId) {
        self.map.entry(key).or_default().push(id);
    }

    /// Remove `id` from under `key`; prunes the key when its list empties
    pub(crate) fn remove(&mut self, key: &NumericalVariant, id: EntryId) -> bool {
        let Some(ids) = self.map.get_mut(key) else {
            return false;
        };
        let Some(pos) = ids.iter().position(|&i| i == id) else {
            return false;
        };
        ids.remove(pos);
        if ids.is_empty() {
            self.map.remove(key);
        }
        true
    }

    /// Earliest-inserted id equal to `key`, if any
    pub(crate) fn find_one(&self, key: &NumericalVariant) -> Option<EntryId> {
        self.map.get(key).and_then(|ids| ids.first().copied())
    }

    /// Every id equal to `key`, in insertion order
    pub(crate) fn find_all(&self, key: &NumericalVariant) -> Vec<EntryId> {
        self.map.get(key).cloned().unwrap_or_default()
    }

    /// Number of distinct keys
    pub(crate) fn key_count(&self) -> usize {
        self.map.len()
    }
}
