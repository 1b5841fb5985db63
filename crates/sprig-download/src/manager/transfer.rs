//! Archive transfer into the cache

use reqwest::header::ACCEPT;
use sprig_cache::StoredArchive;
use sprig_core::error::{SprigError, SprigResult};
use sprig_registry::DistInfo;
use tracing::debug;

use super::DownloadManager;
use crate::options::DownloadOptions;
use crate::progress::{ProgressDisplay, TransferProgress};

const ARCHIVE_ACCEPT: &str = "application/octet-stream";

impl DownloadManager {
    /// Stream `dist.tarball` into the cache, hashing as it is written.
    ///
    /// Transfers are not retried. Any failure removes the partial file.
    pub(super) async fn transfer(
        &self,
        name: &str,
        version: &str,
        dist: &DistInfo,
        options: &DownloadOptions,
    ) -> SprigResult<StoredArchive> {
        debug!(package = name, version, url = %dist.tarball, "Starting archive transfer");

        let mut request = self
            .registry()
            .http()
            .get(&dist.tarball)
            .header(ACCEPT, ARCHIVE_ACCEPT);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let mut response = request.send().await.map_err(|e| {
            SprigError::network(format!("Failed to download {}@{}", name, version), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SprigError::Http {
                status: status.as_u16(),
                url: dist.tarball.clone(),
                body: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let mut writer = self.cache().writer(name, version).await?;
        let display = options.show_progress.then(|| {
            ProgressDisplay::start(
                TransferProgress::new(response.content_length()),
                format!("{}@{}", name, version),
            )
        });

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.discard().await;
                    return Err(SprigError::network(
                        format!("Download of {}@{} was interrupted", name, version),
                        e,
                    ));
                },
            };

            writer.write_chunk(&chunk).await?;
            if let Some(display) = &display {
                display.progress().add(chunk.len() as u64);
            }
        }

        if let Some(display) = display {
            display.finish().await;
        }
        debug!(package = name, version, bytes = writer.bytes_written(), "Transfer complete");

        writer.finish(&dist.shasum).await
    }
}
