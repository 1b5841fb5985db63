//! Streaming archive writer
//!
//! Bytes go to a uniquely named `.part` file beside the target while being
//! hashed. Only a matching checksum renames the file into place; any other
//! outcome removes it.

use camino::{Utf8Path, Utf8PathBuf};
use sprig_core::error::SprigError;
use sprig_core::utils::{checksums_match, ChecksumHasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::CacheResult;

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writer for one archive transfer
#[derive(Debug)]
pub struct ArchiveWriter {
    /// `name@version`, for error messages
    package: String,
    target: Utf8PathBuf,
    /// Present until the writer is finished or discarded
    part_path: Option<Utf8PathBuf>,
    file: Option<BufWriter<File>>,
    hasher: ChecksumHasher,
}

/// An archive that passed verification and now sits at its final path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArchive {
    pub path: Utf8PathBuf,
    pub checksum: String,
    pub size: u64,
}

impl ArchiveWriter {
    pub(crate) async fn create(package: String, target: Utf8PathBuf) -> CacheResult<Self> {
        let parent = target.parent().unwrap_or_else(|| Utf8Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SprigError::io(format!("Failed to create cache directory {}", parent), e))?;

        let part_path = part_path_for(&target);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part_path)
            .await
            .map_err(|e| SprigError::io(format!("Failed to create {}", part_path), e))?;

        Ok(Self {
            package,
            target,
            part_path: Some(part_path),
            file: Some(BufWriter::new(file)),
            hasher: ChecksumHasher::new(),
        })
    }

    /// Final path the archive will have once verified
    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.hasher.bytes()
    }

    /// Append a chunk, hashing it on the way
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> CacheResult<()> {
        let file = self.file.as_mut().ok_or_else(|| SprigError::TaskFailed {
            message: format!("archive writer for {} is already closed", self.package),
        })?;
        file.write_all(chunk)
            .await
            .map_err(|e| SprigError::io(format!("Failed to write archive for {}", self.package), e))?;
        self.hasher.update(chunk);
        Ok(())
    }

    /// Verify the written bytes against `expected` and move them into place.
    ///
    /// On mismatch the partial file is deleted and `ChecksumMismatch` returned.
    pub async fn finish(mut self, expected: &str) -> CacheResult<StoredArchive> {
        let part_path = self.part_path.take().ok_or_else(|| SprigError::TaskFailed {
            message: format!("archive writer for {} is already closed", self.package),
        })?;

        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush().await {
                remove_quietly(&part_path).await;
                return Err(SprigError::io(
                    format!("Failed to flush archive for {}", self.package),
                    e,
                ));
            }
        }

        let size = self.hasher.bytes();
        let actual = std::mem::take(&mut self.hasher).finalize_hex();

        if !checksums_match(expected, &actual) {
            warn!(
                package = %self.package,
                expected,
                actual = %actual,
                bytes = size,
                "Checksum mismatch, discarding transfer"
            );
            remove_quietly(&part_path).await;
            return Err(SprigError::ChecksumMismatch {
                package: self.package.clone(),
                expected: expected.to_string(),
                actual,
            });
        }

        if let Err(e) = tokio::fs::rename(&part_path, &self.target).await {
            remove_quietly(&part_path).await;
            return Err(SprigError::io(
                format!("Failed to move archive into {}", self.target),
                e,
            ));
        }

        debug!(package = %self.package, path = %self.target, bytes = size, "Stored verified archive");
        Ok(StoredArchive {
            path: self.target.clone(),
            checksum: actual,
            size,
        })
    }

    /// Abandon the transfer and delete the partial file
    pub async fn discard(mut self) {
        self.file.take();
        if let Some(part_path) = self.part_path.take() {
            remove_quietly(&part_path).await;
        }
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        // Writers dropped mid-transfer (task aborted, error path) leave no file behind
        self.file.take();
        if let Some(part_path) = self.part_path.take() {
            let _ = std::fs::remove_file(part_path);
        }
    }
}

fn part_path_for(target: &Utf8Path) -> Utf8PathBuf {
    let unique = PART_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().unwrap_or("archive");
    target.with_file_name(format!(
        "{}.{}.{}.part",
        file_name,
        std::process::id(),
        unique
    ))
}

async fn remove_quietly(path: &Utf8Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path, error = %e, "Failed to remove partial archive");
        }
    }
}
