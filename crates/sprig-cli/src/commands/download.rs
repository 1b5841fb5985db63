//! `sprig download` command implementation.

use std::time::Instant;

use sprig_cache::format_size;
use sprig_core::error::SprigResult;
use sprig_download::DownloadResult;

use super::{parse_package_spec, CommandContext};

/// Execute the `sprig download` command
pub async fn execute(spec: &str, with_dependencies: bool, ctx: &CommandContext) -> SprigResult<()> {
    let start_time = Instant::now();
    let (name, constraint) = parse_package_spec(spec);
    let manager = ctx.download_manager()?;
    let options = ctx.download_options();

    ctx.output.step(&format!("Downloading {}@{}", name, constraint));
    let result = manager.download_package(&name, &constraint, &options).await?;
    report(&result, ctx);

    if with_dependencies {
        ctx.output.step(&format!("Downloading dependencies of {}@{}", name, result.version));
        let downloads = manager
            .download_dependencies(&name, &result.version, &options)
            .await?;

        for dependency in &downloads.results {
            report(dependency, ctx);
        }
        let (results, error) = downloads.into_parts();
        if let Some(error) = error {
            return Err(error);
        }
        ctx.output.detail(&format!("{} dependencies ready", results.len()));
    }

    ctx.output.success(&format!(
        "Done in {:.2}s",
        start_time.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// One line per downloaded archive
pub(crate) fn report(result: &DownloadResult, ctx: &CommandContext) {
    let origin = if result.cached { "cached" } else { "downloaded" };

    ctx.output.success(&format!(
        "{}@{} {} ({})",
        result.name,
        result.version,
        origin,
        format_size(result.size)
    ));
    ctx.output.detail(&format!("  {} sha1:{}", result.path, result.checksum));
}
