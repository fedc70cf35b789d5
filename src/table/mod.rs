//! Table Module
//!
//! A single homogeneous array of fixed-stride byte slots.
//!
//! ## Responsibilities
//! - O(1) id-addressable slot storage at a stride fixed at creation
//! - Slot allocation with bounded FIFO free-pool reuse
//! - Doubling growth that never invalidates ids
//! - Dirty tracking (per-slot flag bit + accumulated id list)
//! - Attached secondary indices, maintained on every mutation
//!
//! ## Slot Layout
//! ```text
//! ┌──────────────────────── buffer: capacity × entry_size ────────────────────────┐
//! │ Slot 0                    │ Slot 1                    │ ...                   │
//! │ ┌────────┬───────┬──────┐ │ ┌────────┬───────┬──────┐ │                       │
//! │ │ id (4) │flags 4│ data │ │ │ id (4) │flags 4│ data │ │                       │
//! │ └────────┴───────┴──────┘ │ └────────┴───────┴──────┘ │                       │
//! └───────────────────────────────────────────────────────────────────────────────┘
//! ```
//! A slot's first 8 bytes are the record's reserved [`EntryHeader`]; the
//! occupied/dirty flags live in the record bytes themselves.
//!
//! [`EntryHeader`]: crate::entry::EntryHeader

mod table;

pub use table::{Table, TableId};
