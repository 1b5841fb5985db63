//! SHA-1 checksums for archive integrity.
//!
//! Registries advertise a hex SHA-1 (`dist.shasum`) per tarball; these
//! helpers compute the same digest over bytes, streams, and files.

use crate::error::{SprigError, SprigResult};
use sha1::{Digest, Sha1};
use std::io::Read;
use std::path::Path;

/// Compute the lowercase hex SHA-1 of data
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Incremental SHA-1 for bytes that arrive in chunks
#[derive(Default, Clone)]
pub struct ChecksumHasher {
    hasher: Sha1,
    bytes: u64,
}

impl std::fmt::Debug for ChecksumHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumHasher")
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}

impl ChecksumHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed another chunk
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes hashed so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Finish and return the lowercase hex digest
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Compute the hex SHA-1 of a file without loading it whole
pub fn sha1_hex_file(path: &Path) -> SprigResult<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| SprigError::io(format!("Failed to open file: {}", path.display()), e))?;

    let mut hasher = ChecksumHasher::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| SprigError::io(format!("Failed to read file: {}", path.display()), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finalize_hex())
}

/// Compare two hex checksums, ignoring case and surrounding whitespace
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}
