//! Download manager
//!
//! `download_package` walks one package through
//! `checking cache -> (hit | transferring) -> (verified | mismatch)`.
//! Dependency sets run the same walk per entry inside a [`TaskPool`].

mod transfer;

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use dashmap::DashMap;
use sprig_cache::{ArchiveCache, CacheLookup};
use sprig_core::error::{DependencyFailure, SprigError, SprigResult};
use sprig_registry::RegistryClient;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::options::DownloadOptions;
use crate::pool::TaskPool;

/// A verified archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Package name
    pub name: String,
    /// Concrete version the constraint resolved to
    pub version: String,
    /// Path of the archive inside the cache
    pub path: Utf8PathBuf,
    /// SHA-1 of the archive bytes
    pub checksum: String,
    /// Archive length in bytes
    pub size: u64,
    /// Served from the cache without a transfer
    pub cached: bool,
}

/// Outcome of downloading a dependency set
#[derive(Debug)]
pub struct DependencyDownloads {
    /// `name@version` whose dependencies these are, or a caller label
    pub package: String,
    /// Successful downloads, in completion order
    pub results: Vec<DownloadResult>,
    /// Every dependency that failed, with its cause
    pub failures: Vec<DependencyFailure>,
}

impl DependencyDownloads {
    fn empty(package: String) -> Self {
        Self {
            package,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether every dependency downloaded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Successes plus, when anything failed, a `PartialDependencyFailure`
    pub fn into_parts(self) -> (Vec<DownloadResult>, Option<SprigError>) {
        if self.failures.is_empty() {
            return (self.results, None);
        }

        let error = SprigError::PartialDependencyFailure {
            package: self.package,
            succeeded: self.results.len(),
            failures: self.failures,
        };
        (self.results, Some(error))
    }

    /// All results, or an error if any dependency failed
    pub fn into_result(self) -> SprigResult<Vec<DownloadResult>> {
        match self.into_parts() {
            (results, None) => Ok(results),
            (_, Some(error)) => Err(error),
        }
    }
}

/// Orchestrates registry lookups, cache checks and archive transfers
#[derive(Debug, Clone)]
pub struct DownloadManager {
    registry: RegistryClient,
    cache: ArchiveCache,
    /// One lock per `name@version` currently being downloaded in this process
    in_flight: Arc<InFlightMap>,
}

impl DownloadManager {
    pub fn new(registry: RegistryClient, cache: ArchiveCache) -> Self {
        Self {
            registry,
            cache,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    /// Download one package version, verifying it against the registry checksum.
    ///
    /// With `use_cache` a verified cache entry is returned without any transfer.
    /// A cached entry that fails verification is evicted and reported as
    /// `CacheCorrupted`; the next call downloads it again.
    pub async fn download_package(
        &self,
        name: &str,
        constraint: &str,
        options: &DownloadOptions,
    ) -> SprigResult<DownloadResult> {
        info!(package = name, constraint, "Downloading package");

        let version_info = self
            .registry
            .get_version_info(name, constraint)
            .await
            .map_err(|e| e.context(format!("Failed to get metadata for {}@{}", name, constraint)))?;
        let version = version_info.version.clone();

        let slot = InFlightSlot::acquire(&self.in_flight, format!("{}@{}", name, version));
        let result = {
            let _guard = slot.lock.lock().await;
            self.fetch_verified(name, &version, &version_info.dist, options).await
        };
        result
    }

    async fn fetch_verified(
        &self,
        name: &str,
        version: &str,
        dist: &sprig_registry::DistInfo,
        options: &DownloadOptions,
    ) -> SprigResult<DownloadResult> {
        if options.use_cache {
            match self.cache.lookup(name, version, &dist.shasum).await? {
                CacheLookup::Hit {
                    path,
                    checksum,
                    size,
                } => {
                    info!(package = name, version, path = %path, "Using cached archive");
                    return Ok(DownloadResult {
                        name: name.to_string(),
                        version: version.to_string(),
                        path,
                        checksum,
                        size,
                        cached: true,
                    });
                },
                CacheLookup::Miss { .. } => {},
            }
        }

        let stored = self.transfer(name, version, dist, options).await?;
        info!(
            package = name,
            version,
            path = %stored.path,
            bytes = stored.size,
            "Downloaded and verified archive"
        );

        Ok(DownloadResult {
            name: name.to_string(),
            version: version.to_string(),
            path: stored.path,
            checksum: stored.checksum,
            size: stored.size,
            cached: false,
        })
    }

    /// Download every dependency declared by the version `constraint` resolves to.
    ///
    /// Failures are collected, not propagated: the returned value holds the
    /// successes and one [`DependencyFailure`] per dependency that failed.
    /// Only a failure to resolve the parent package itself is an `Err`.
    pub async fn download_dependencies(
        &self,
        name: &str,
        constraint: &str,
        options: &DownloadOptions,
    ) -> SprigResult<DependencyDownloads> {
        info!(package = name, constraint, "Downloading dependencies");

        let version_info = self
            .registry
            .get_version_info(name, constraint)
            .await
            .map_err(|e| e.context(format!("Failed to get metadata for {}@{}", name, constraint)))?;
        let package = format!("{}@{}", name, version_info.version);

        if version_info.dependencies.is_empty() {
            info!(package = %package, "No dependencies found");
            return Ok(DependencyDownloads::empty(package));
        }

        info!(
            package = %package,
            count = version_info.dependencies.len(),
            "Found dependencies"
        );
        Ok(self
            .download_all(package, &version_info.dependencies, options)
            .await)
    }

    /// Download an arbitrary `name -> constraint` set through the bounded pool
    pub async fn download_all(
        &self,
        label: impl Into<String>,
        dependencies: &BTreeMap<String, String>,
        options: &DownloadOptions,
    ) -> DependencyDownloads {
        let mut downloads = DependencyDownloads::empty(label.into());
        if dependencies.is_empty() {
            return downloads;
        }

        let mut pool = TaskPool::new(options.effective_concurrency());
        for (dependency, constraint) in dependencies {
            let manager = self.clone();
            let options = options.clone();
            let (task_name, task_constraint) = (dependency.clone(), constraint.clone());

            pool.spawn((dependency.clone(), constraint.clone()), async move {
                debug!(package = %task_name, constraint = %task_constraint, "Downloading dependency");
                manager
                    .download_package(&task_name, &task_constraint, &options)
                    .await
            });
        }

        for ((dependency, constraint), outcome) in pool.join_all().await {
            match outcome {
                Ok(result) => downloads.results.push(result),
                Err(error) => {
                    warn!(
                        package = %dependency,
                        constraint = %constraint,
                        kind = error.kind(),
                        error = %error,
                        "Dependency download failed"
                    );
                    downloads.failures.push(DependencyFailure {
                        name: dependency,
                        constraint,
                        error,
                    });
                },
            }
        }

        if downloads.is_complete() {
            info!(
                package = %downloads.package,
                count = downloads.results.len(),
                peak = pool.peak_active(),
                "Downloaded all dependencies"
            );
        } else {
            warn!(
                package = %downloads.package,
                succeeded = downloads.results.len(),
                failed = downloads.failures.len(),
                "Some dependencies failed to download"
            );
        }
        downloads
    }
}

type InFlightMap = DashMap<String, Arc<Mutex<()>>>;

/// A caller's claim on one `name@version` lock.
///
/// Dropping it removes the map entry once no other caller holds the same
/// lock, whether the download finished, failed or was cancelled.
struct InFlightSlot<'a> {
    map: &'a InFlightMap,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn acquire(map: &'a InFlightMap, key: String) -> Self {
        let lock = map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self { map, key, lock }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        // The map and this slot are the only holders when nobody else waits
        self.map
            .remove_if(&self.key, |_, held| Arc::strong_count(held) <= 2);
    }
}
