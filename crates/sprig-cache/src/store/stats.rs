//! Cache size accounting and clearing

use sprig_core::error::SprigError;
use std::io::ErrorKind;
use tracing::info;
use walkdir::WalkDir;

use super::{ArchiveCache, ARCHIVE_FILE_NAME};
use crate::CacheResult;

/// Totals over every stored archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of archives
    pub entries: usize,
    /// Sum of archive sizes in bytes
    pub total_bytes: u64,
}

/// Result of clearing the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearResult {
    /// Number of archives removed
    pub entries_removed: usize,
    /// Bytes freed
    pub freed_space: u64,
}

impl ClearResult {
    /// Format freed space in human-readable format
    pub fn format_freed_space(&self) -> String {
        format_size(self.freed_space)
    }
}

/// Format a byte count as `512 B`, `1.5 KB`, `2.0 GB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

impl ArchiveCache {
    /// Count archives and their total size; partial transfers are ignored
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = CacheStats::default();
        if !self.root().exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(self.root()) {
            let entry = entry.map_err(|e| {
                let message = format!("Failed to scan cache {}", self.root());
                match e.into_io_error() {
                    Some(io) => SprigError::io(message, io),
                    None => SprigError::io(message, ErrorKind::Other.into()),
                }
            })?;

            if entry.file_type().is_file() && entry.file_name() == ARCHIVE_FILE_NAME {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                stats.entries += 1;
                stats.total_bytes += size;
            }
        }

        Ok(stats)
    }

    /// Delete every cached archive
    pub fn clear(&self) -> CacheResult<ClearResult> {
        let stats = self.stats()?;

        match std::fs::remove_dir_all(self.root()) {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => {
                return Err(SprigError::io(
                    format!("Failed to clear cache {}", self.root()),
                    e,
                ))
            },
        }

        info!(
            path = %self.root(),
            entries = stats.entries,
            bytes = stats.total_bytes,
            "Cleared archive cache"
        );
        Ok(ClearResult {
            entries_removed: stats.entries,
            freed_space: stats.total_bytes,
        })
    }
}
