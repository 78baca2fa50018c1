//! Fix command: plan remediation for violations and apply it within a
//! safety ceiling

use super::repository_root;
use crate::config::load_project_config;
use crate::fixes::{self, ApplyOptions, SafetyTier, TemplateContext};
use crate::reporters::{self, OutputFormat};
use crate::validator::{repository_id, Validator};
use anyhow::{anyhow, Context, Result};
use console::style;
use tracing::info;

pub(super) fn run(
    path: &std::path::Path,
    dry_run: bool,
    safe_only: bool,
    safety_level: Option<&str>,
    json: bool,
) -> Result<()> {
    let root = repository_root(path)?;
    let config = load_project_config(&root);

    let max_safety = if safe_only {
        SafetyTier::Safe
    } else {
        match safety_level {
            Some(level) => level.parse::<SafetyTier>().map_err(|e| anyhow!(e))?,
            None => config.remediation.safety_level,
        }
    };

    let validator = Validator::from_config(&root, &config)
        .context("Failed to load repository schemas")?;
    let requested = config.validation.repository_type.as_deref();
    let validation = validator
        .validate(&root, requested)
        .with_context(|| format!("Failed to validate {}", root.display()))?;

    let context = TemplateContext::new(repository_id(&root), validation.schema.name.clone());
    let actions = fixes::plan(&validation, &context);
    let options = ApplyOptions {
        max_safety,
        dry_run,
        backup_dir: config.remediation.backup_dir.clone(),
    };
    let report = fixes::apply(&actions, &root, &options);

    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    println!("{}", reporters::remediation(&report, format)?);

    if !dry_run && report.changes() > 0 {
        let after = validator
            .validate(&root, requested)
            .with_context(|| format!("Failed to re-validate {}", root.display()))?;
        info!(
            "Score {:.2} -> {:.2} after {} change(s)",
            validation.result.score,
            after.result.score,
            report.changes()
        );
        if !json {
            println!(
                "Score: {:.2} → {}",
                validation.result.score,
                style(format!("{:.2}", after.result.score)).bold()
            );
        }
    }

    if report.failed() > 0 {
        anyhow::bail!("{} remediation action(s) failed", report.failed());
    }
    Ok(())
}
