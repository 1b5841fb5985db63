//! Shared fixtures for benchmarks

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use sprig_registry::{DistInfo, PackageMetadata, VersionInfo};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// `count` version keys spread over majors, minors and a few prereleases
pub fn version_keys(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let (major, minor, patch) = (i / 100, (i / 10) % 10, i % 10);
            if i % 17 == 0 {
                format!("{}.{}.{}-beta.{}", major, minor, patch, i % 3)
            } else {
                format!("{}.{}.{}", major, minor, patch)
            }
        })
        .collect()
}

/// Registry document with `count` published versions
pub fn package_metadata(name: &str, count: usize) -> PackageMetadata {
    let keys = version_keys(count);
    let latest = keys.last().cloned().unwrap_or_else(|| "0.0.0".to_string());

    let versions = keys
        .into_iter()
        .map(|key| {
            let info = VersionInfo {
                version: key.clone(),
                dependencies: BTreeMap::new(),
                dist: DistInfo {
                    tarball: format!("https://registry.example/{}/-/{}-{}.tgz", name, name, key),
                    shasum: "0".repeat(40),
                    integrity: None,
                },
            };
            (key, info)
        })
        .collect();

    PackageMetadata {
        name: name.to_string(),
        description: None,
        dist_tags: HashMap::from([("latest".to_string(), latest)]),
        versions,
    }
}

/// Deterministic archive-like bytes
pub fn archive_bytes(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}
