//! Archive cache store
//!
//! Maps `(name, version)` to a file path and decides whether the file found
//! there can be trusted.

mod stats;
mod writer;

pub use stats::{format_size, CacheStats, ClearResult};
pub use writer::{ArchiveWriter, StoredArchive};

use camino::{Utf8Path, Utf8PathBuf};
use sprig_core::error::SprigError;
use sprig_core::utils::{checksums_match, safe_join, validate_package_name, ChecksumHasher};
use std::io::ErrorKind;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::CacheResult;

/// File name of every cached archive
pub const ARCHIVE_FILE_NAME: &str = "package.tgz";

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// On-disk archive cache rooted at one directory
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    /// Root directory (~/.sprig/cache by default)
    root: Utf8PathBuf,
}

/// Outcome of a verified cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The file exists and its checksum matches
    Hit {
        path: Utf8PathBuf,
        checksum: String,
        size: u64,
    },
    /// Nothing usable is stored at `path`
    Miss { path: Utf8PathBuf },
}

impl CacheLookup {
    pub fn path(&self) -> &Utf8Path {
        match self {
            CacheLookup::Hit { path, .. } | CacheLookup::Miss { path } => path,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }
}

impl ArchiveCache {
    /// Create a cache handle; directories are created lazily on first write
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root path of the cache
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path an archive for `name@version` is stored at
    pub fn entry_path(&self, name: &str, version: &str) -> CacheResult<Utf8PathBuf> {
        validate_package_name(name)?;
        check_version_segment(name, version)?;

        let relative = Utf8PathBuf::from(name).join(version).join(ARCHIVE_FILE_NAME);
        let joined = safe_join(self.root.as_std_path(), relative.as_std_path())?;
        Utf8PathBuf::from_path_buf(joined).map_err(|p| SprigError::InvalidPackageName {
            name: name.to_string(),
            reason: format!("cache path {} is not valid UTF-8", p.display()),
        })
    }

    /// Look up `name@version` and verify it against `expected_checksum`.
    ///
    /// A missing file is a plain miss. A file whose checksum differs is
    /// deleted and reported as `CacheCorrupted`, never as a miss.
    pub async fn lookup(
        &self,
        name: &str,
        version: &str,
        expected_checksum: &str,
    ) -> CacheResult<CacheLookup> {
        let path = self.entry_path(name, version)?;

        let (actual, size) = match hash_file(&path).await {
            Ok(hashed) => hashed,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(package = name, version, path = %path, "Cache miss");
                return Ok(CacheLookup::Miss { path });
            },
            Err(e) => {
                warn!(package = name, version, path = %path, error = %e, "Unreadable cache entry, treating as miss");
                return Ok(CacheLookup::Miss { path });
            },
        };

        if checksums_match(expected_checksum, &actual) {
            debug!(package = name, version, path = %path, "Cache hit");
            return Ok(CacheLookup::Hit {
                path,
                checksum: actual,
                size,
            });
        }

        warn!(
            package = name,
            version,
            path = %path,
            expected = expected_checksum,
            actual = %actual,
            "Cached archive failed verification, evicting"
        );
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| SprigError::io(format!("Failed to evict corrupted archive {}", path), e))?;

        Err(SprigError::CacheCorrupted {
            package: format!("{}@{}", name, version),
            path: path.to_string(),
            expected: expected_checksum.to_string(),
            actual,
        })
    }

    /// Open a streaming writer for `name@version`
    pub async fn writer(&self, name: &str, version: &str) -> CacheResult<ArchiveWriter> {
        let target = self.entry_path(name, version)?;
        ArchiveWriter::create(format!("{}@{}", name, version), target).await
    }

    /// Remove the archive for `name@version`; returns whether one existed
    pub async fn remove(&self, name: &str, version: &str) -> CacheResult<bool> {
        let path = self.entry_path(name, version)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SprigError::io(format!("Failed to remove {}", path), e)),
        }
    }
}

fn check_version_segment(name: &str, version: &str) -> CacheResult<()> {
    let invalid = version.is_empty()
        || version == "."
        || version == ".."
        || version.starts_with('.')
        || version.contains(['/', '\\']);
    if invalid {
        return Err(SprigError::InvalidPackageName {
            name: format!("{}@{}", name, version),
            reason: "version cannot be used as a directory name".to_string(),
        });
    }
    Ok(())
}

/// Hex SHA-1 and length of a file
async fn hash_file(path: &Utf8Path) -> std::io::Result<(String, u64)> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = ChecksumHasher::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let size = hasher.bytes();
    Ok((hasher.finalize_hex(), size))
}
