//! Version resolution benchmarks
//!
//! Constraint parsing, selector construction from metadata keys and
//! best-match selection across packages with many published versions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sprig_benchmarks::{criterion_config, package_metadata, version_keys};
use sprig_core::types::{Version, VersionReq};
use sprig_registry::{select_version, VersionSelector};

const CONSTRAINTS: &[&str] = &["^1.2.0", "~2.3.4", ">=1.0.0 <3.0.0", "1.x || 4.x", "*", "3.4.5"];

/// Benchmark parsing of version strings and range expressions
fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.measurement_time(std::time::Duration::from_secs(5));

    group.bench_function("version", |b| {
        b.iter(|| black_box("12.4.7-beta.3+build.9".parse::<Version>()))
    });

    for constraint in CONSTRAINTS {
        group.bench_with_input(BenchmarkId::new("range", constraint), constraint, |b, constraint| {
            b.iter(|| black_box(VersionReq::parse(constraint)))
        });
    }

    group.finish();
}

/// Benchmark building a selector from raw metadata keys
fn bench_selector_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_build");

    for count in [10, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        let keys = version_keys(count);

        group.bench_with_input(BenchmarkId::new("versions", count), &keys, |b, keys| {
            b.iter(|| black_box(VersionSelector::from_keys(keys.iter().map(String::as_str))))
        });
    }

    group.finish();
}

/// Benchmark best-match selection on a prebuilt selector
fn bench_select_best(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_best");
    let selector = VersionSelector::from_keys(version_keys(1000).iter().map(String::as_str));

    for constraint in CONSTRAINTS {
        let Ok(req) = VersionReq::parse(constraint) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("range", constraint), &req, |b, req| {
            b.iter(|| black_box(selector.select_best(req)))
        });
    }

    group.finish();
}

/// Benchmark full resolution against metadata, dist-tags included
fn bench_select_version(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_version");
    group.measurement_time(std::time::Duration::from_secs(5));

    for count in [10, 100, 1000] {
        let metadata = package_metadata("bench-pkg", count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("range", count), &metadata, |b, metadata| {
            b.iter(|| black_box(select_version(metadata, "^1.0.0")))
        });
        group.bench_with_input(BenchmarkId::new("latest", count), &metadata, |b, metadata| {
            b.iter(|| black_box(select_version(metadata, "latest")))
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_parsing, bench_selector_build, bench_select_best, bench_select_version
}
criterion_main!(benches);
