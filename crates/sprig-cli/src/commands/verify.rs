//! `sprig verify` command implementation.
//!
//! Checks the cached archive for a package against the checksum the registry
//! publishes. Never downloads.

use sprig_cache::CacheLookup;
use sprig_core::error::SprigResult;

use super::{parse_package_spec, CommandContext};

/// Outcome of a verification, for callers that need more than the exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    NotCached,
}

/// Execute the `sprig verify` command
pub async fn execute(spec: &str, ctx: &CommandContext) -> SprigResult<()> {
    verify(spec, ctx).await.map(|_| ())
}

pub async fn verify(spec: &str, ctx: &CommandContext) -> SprigResult<Verification> {
    let (name, constraint) = parse_package_spec(spec);
    let registry = ctx.registry()?;
    let cache = ctx.cache()?;

    let version_info = registry.get_version_info(&name, &constraint).await?;
    let expected = &version_info.dist.shasum;

    // A corrupted entry is evicted by the lookup and surfaces as an error
    match cache.lookup(&name, &version_info.version, expected).await? {
        CacheLookup::Hit { path, checksum, .. } => {
            ctx.output.success(&format!("{}@{} is intact", name, version_info.version));
            ctx.output.detail(&format!("  {} sha1:{}", path, checksum));
            Ok(Verification::Valid)
        },
        CacheLookup::Miss { path } => {
            ctx.output.warn(&format!(
                "{}@{} is not cached (expected at {})",
                name, version_info.version, path
            ));
            Ok(Verification::NotCached)
        },
    }
}
