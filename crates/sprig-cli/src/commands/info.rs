//! `sprig info` command implementation.

use sprig_core::error::SprigResult;
use sprig_core::types::Version;

use super::CommandContext;

/// Most recent versions listed
const MAX_LISTED_VERSIONS: usize = 10;

/// Execute the `sprig info` command
pub async fn execute(name: &str, ctx: &CommandContext) -> SprigResult<()> {
    let registry = ctx.registry()?;
    let metadata = registry.fetch_metadata(name).await?;

    ctx.output.step(&metadata.name);
    if let Some(description) = metadata.description.as_deref().filter(|d| !d.is_empty()) {
        ctx.output.info(description);
    }

    let mut tags: Vec<(&String, &String)> = metadata.dist_tags.iter().collect();
    tags.sort();
    for (tag, version) in tags {
        ctx.output.info(&format!("  {}: {}", tag, version));
    }

    let mut versions: Vec<Version> = metadata
        .versions
        .keys()
        .filter_map(|key| key.parse().ok())
        .collect();
    versions.sort_unstable_by(|a, b| b.cmp(a));
    ctx.output.info(&format!("  versions: {}", metadata.versions.len()));
    let recent: Vec<String> = versions
        .iter()
        .take(MAX_LISTED_VERSIONS)
        .map(ToString::to_string)
        .collect();
    if !recent.is_empty() {
        ctx.output.detail(&format!("  recent: {}", recent.join(", ")));
    }

    if let Some(latest) = metadata.tag("latest").and_then(|v| metadata.versions.get(v)) {
        if latest.dependencies.is_empty() {
            ctx.output.detail("  no dependencies");
        } else {
            ctx.output.info(&format!("  dependencies ({}):", latest.dependencies.len()));
            for (dependency, constraint) in &latest.dependencies {
                ctx.output.detail(&format!("    {} {}", dependency, constraint));
            }
        }
        ctx.output.detail(&format!("  tarball: {}", latest.dist.tarball));
    }

    Ok(())
}
