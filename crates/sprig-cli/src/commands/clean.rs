//! `sprig clean` command implementation.

use sprig_core::error::SprigResult;

use super::CommandContext;

/// Execute the `sprig clean` command
pub async fn execute(ctx: &CommandContext) -> SprigResult<()> {
    let cache = ctx.cache()?;
    ctx.output.step(&format!("Cleaning cache at {}", cache.root()));

    let result = cache.clear()?;
    if result.entries_removed == 0 {
        ctx.output.info("Cache is already empty");
    } else {
        ctx.output.success(&format!(
            "Removed {} archives, freed {}",
            result.entries_removed,
            result.format_freed_space()
        ));
    }
    Ok(())
}
