//! `sprig install` command implementation.
//!
//! Reads package.json from the current directory and downloads every listed
//! dependency (and devDependency unless `--production`) into the cache
//! through the bounded download pool.

use std::time::Instant;

use sprig_config::json::load_from_file;
use sprig_config::PackageJson;
use sprig_core::error::{SprigError, SprigResult};
use sprig_download::DownloadResult;

use super::download::report;
use super::CommandContext;

/// Execute the `sprig install` command
pub async fn execute(production: bool, ctx: &CommandContext) -> SprigResult<()> {
    install(production, ctx).await.map(|_| ())
}

pub async fn install(production: bool, ctx: &CommandContext) -> SprigResult<Vec<DownloadResult>> {
    let start_time = Instant::now();
    let manifest = read_manifest(ctx).await?;

    let dependencies = manifest.install_set(!production);
    if dependencies.is_empty() {
        ctx.output.info("No dependencies to install");
        return Ok(Vec::new());
    }

    ctx.output.step(&format!(
        "Installing {} dependencies of {}@{}",
        dependencies.len(),
        manifest.name,
        manifest.version
    ));

    let manager = ctx.download_manager()?;
    let downloads = manager
        .download_all(
            format!("{}@{}", manifest.name, manifest.version),
            &dependencies,
            &ctx.download_options(),
        )
        .await;

    for result in &downloads.results {
        report(result, ctx);
    }
    for failure in &downloads.failures {
        ctx.output.error(&failure.to_string());
    }

    let results = downloads.into_result()?;
    ctx.output.success(&format!(
        "Installed {} packages in {:.2}s",
        results.len(),
        start_time.elapsed().as_secs_f64()
    ));
    Ok(results)
}

async fn read_manifest(ctx: &CommandContext) -> SprigResult<PackageJson> {
    let path = ctx.cwd.join("package.json");
    if !path.is_file() {
        return Err(SprigError::ConfigValidation {
            field: "package.json".to_string(),
            reason: format!("No package.json found in {}; run `sprig init` first", ctx.cwd),
        });
    }

    let manifest = load_from_file(&path).await?;
    let problems = manifest.validate();
    if let Some(first) = problems.first() {
        for problem in &problems {
            ctx.output.error(&problem.to_string());
        }
        return Err(SprigError::ConfigValidation {
            field: format!("package.json {}", first.field),
            reason: format!("{} ({} problems in total)", first.message, problems.len()),
        });
    }

    Ok(manifest)
}
