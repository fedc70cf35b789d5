//! Error types for MemDB
//!
//! Provides a unified error type for all operations.
//!
//! Three classes of failure exist and are kept apart deliberately:
//! - **Contract violations** (wrong record size/alignment for a table) are
//!   `Err` variants that fire before any byte is touched.
//! - **Expected misses** (no match, delete of an already-freed id) are NOT
//!   errors — operations return `Ok(false)` / `Ok(None)` / an empty `Vec`.
//! - **Resource failures** (I/O, corrupt snapshot) are `Err` variants that
//!   leave all store state unchanged.

use thiserror::Error;

/// Result type alias using MemDbError
pub type Result<T> = std::result::Result<T, MemDbError>;

/// Unified error type for MemDB operations
#[derive(Debug, Error)]
pub enum MemDbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    // -------------------------------------------------------------------------
    // Contract Violations
    // -------------------------------------------------------------------------
    #[error(
        "Record layout mismatch: table expects size={expected_size} align={expected_align}, \
         caller supplied size={got_size} align={got_align}"
    )]
    LayoutMismatch {
        expected_size: usize,
        expected_align: usize,
        got_size: usize,
        got_align: usize,
    },

    #[error("Invalid record layout: {0}")]
    InvalidLayout(String),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index already exists: {0}")]
    IndexExists(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid index definition: {0}")]
    InvalidIndex(String),

    #[error("Duplicate key on unique index: {0}")]
    DuplicateKey(String),

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("No data directory bound: call open() before save()/load()")]
    NotOpen,
}
