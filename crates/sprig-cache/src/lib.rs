//! Verified archive cache for Sprig
//!
//! Archives live at `<root>/<name>/<version>/package.tgz`. Nothing about an
//! entry is trusted from its existence alone: every lookup re-hashes the
//! file and compares it with the checksum the registry advertises, evicting
//! entries that no longer match.

pub mod store;

// Re-export main types
pub use store::{
    format_size, ArchiveCache, ArchiveWriter, CacheLookup, CacheStats, ClearResult,
    StoredArchive, ARCHIVE_FILE_NAME,
};

use sprig_core::error::SprigError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, SprigError>;
