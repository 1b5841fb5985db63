//! `sprig init` command implementation.

use sprig_config::json::save_to_file;
use sprig_config::PackageJson;
use sprig_core::error::SprigResult;

use super::CommandContext;

/// Execute the `sprig init` command
pub async fn execute(force: bool, ctx: &CommandContext) -> SprigResult<()> {
    let path = ctx.cwd.join("package.json");

    if path.exists() && !force {
        ctx.output.info("package.json already exists, skipping initialization");
        ctx.output.detail("Use --force to overwrite it");
        return Ok(());
    }

    let manifest = PackageJson::new_for_dir(&ctx.cwd);
    save_to_file(&path, &manifest).await?;

    ctx.output.success(&format!("Created {}", path));
    ctx.output.info("");
    ctx.output.info("Next steps:");
    ctx.output.info("  add dependencies to package.json");
    ctx.output.info("  sprig install");
    Ok(())
}
