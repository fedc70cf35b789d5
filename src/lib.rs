//! # MemDB
//!
//! An embedded, in-process fixed-record table store with:
//! - Typed POD records behind a type-erased fixed-stride slot buffer
//! - Stable 32-bit identifiers that survive table growth
//! - Optional secondary numeric indices with a duplicate policy
//! - Dirty-tracked binary persistence (full / dirty / dirty-list saves)
//! - One coarse reader-writer lock per store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Store (façade)                           │
//! │        registry · coarse RwLock · lock-free stats            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Table    │◄────────►│    Index    │
//!   │ (slot I/O)  │          │ (key maint) │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ Persistence │
//!   │   (codec)   │
//!   └─────────────┘
//! ```
//!
//! Callers go through the [`Store`] façade, which locks, delegates slot I/O
//! to a table and key maintenance to its attached indices, and optionally
//! invokes the persistence codec to serialize or replay records.
//!
//! ## Quick Start
//!
//! ```
//! use bytemuck::{Pod, Zeroable};
//! use memdb::{EntryHeader, Record, Store};
//!
//! #[repr(C)]
//! #[derive(Clone, Copy, Pod, Zeroable)]
//! struct Item {
//!     header: EntryHeader,
//!     uid: u32,
//!     count: u32,
//! }
//!
//! impl Record for Item {
//!     fn header(&self) -> &EntryHeader { &self.header }
//!     fn header_mut(&mut self) -> &mut EntryHeader { &mut self.header }
//! }
//!
//! let store = Store::new();
//! let items = store.create_table_for::<Item>("items").unwrap();
//!
//! let mut item = Item::zeroed();
//! item.uid = 42;
//! item.count = 3;
//! let id = store.insert(items, &item).unwrap();
//!
//! let count = store.select(items, id, |it: &Item| it.count).unwrap();
//! assert_eq!(count, Some(3));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod entry;
pub mod variant;
pub mod stats;
pub mod table;
pub mod index;
pub mod persist;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MemDbError, Result};
pub use config::Config;
pub use entry::{EntryHeader, EntryId, Record, FLAG_DIRTY, FLAG_OCCUPIED};
pub use variant::{NumericalVariant, VariantKind};
pub use stats::{StoreStats, TableStats};
pub use table::TableId;
pub use index::Index;
pub use persist::{EntryWriter, SaveMode};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of MemDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
