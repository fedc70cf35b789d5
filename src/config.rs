//! Configuration for MemDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a MemDB store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Root directory for table snapshot files. `Store::open()` can rebind
    /// this at runtime; `None` means no directory bound yet.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {table_name}.mdb    (one snapshot file per table)
    pub data_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Byte budget used to size a new table's default slot capacity:
    /// `capacity = max(1, default_capacity_bytes / entry_size)`.
    pub default_capacity_bytes: usize,

    /// Default bound on each table's free-slot reuse pool. Freed slots
    /// beyond the bound stay free but are not kept for fast reuse.
    /// Tunable per table via `Store::set_table_free_cache()`.
    pub free_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_capacity_bytes: 1024, // roughly 1KB of records per new table
            free_cache_size: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot root directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(path.into());
        self
    }

    /// Set the byte budget for default table capacity
    pub fn default_capacity_bytes(mut self, bytes: usize) -> Self {
        self.config.default_capacity_bytes = bytes;
        self
    }

    /// Set the default free-slot reuse pool bound
    pub fn free_cache_size(mut self, size: usize) -> Self {
        self.config.free_cache_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
