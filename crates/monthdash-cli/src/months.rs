//! Month folder commands: `months` and `init-month`.

use anyhow::Context;
use monthdash_core::{AppConfig, YearMonth};
use monthdash_io::FolderLayout;

/// List months that have a folder under the output directory.
///
/// # Errors
///
/// Returns an error if the output directory exists but cannot be read.
pub(crate) fn run_months(config: &AppConfig) -> anyhow::Result<()> {
    let layout = FolderLayout::new(config.output_dir.clone());
    let months = layout
        .list_months()
        .with_context(|| format!("failed to list months in {}", layout.root().display()))?;

    if months.is_empty() {
        println!(
            "no months found in {}; run `monthdash run` or `monthdash init-month` first",
            layout.root().display()
        );
        return Ok(());
    }
    for period in &months {
        println!("{period}");
    }
    Ok(())
}

/// Create the month's media and analysis folders.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub(crate) fn run_init_month(config: &AppConfig, period: YearMonth) -> anyhow::Result<()> {
    let layout = FolderLayout::new(config.output_dir.clone());
    let created = layout
        .create_month_tree(period)
        .with_context(|| format!("failed to create folders for {period}"))?;

    println!("initialised {} ({} folders)", layout.month_dir(period).display(), created.len());
    for dir in &created {
        println!("  {}", dir.display());
    }
    Ok(())
}
