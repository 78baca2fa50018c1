//! Init command - write an example repohealth.toml

use super::repository_root;
use crate::config::{CONFIG_FILE, EXAMPLE_CONFIG};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

pub(super) fn run(path: &Path) -> Result<()> {
    let root = repository_root(path)?;
    let config_path = root.join(CONFIG_FILE);

    if config_path.exists() {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!("\nNext: {}", style("repohealth validate .").bold());
    Ok(())
}
