//! Validate command: score one repository and apply the CI gate

use super::repository_root;
use crate::config::{database_path, load_project_config};
use crate::health::{HealthTracker, RedbStore};
use crate::reporters::{self, OutputFormat};
use crate::validator::{gate, repository_id, GateOutcome, Validator};
use anyhow::{Context, Result};
use console::style;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

pub(super) struct ValidateArgs<'a> {
    pub path: &'a Path,
    pub repo_type: Option<&'a str>,
    pub format: &'a str,
    pub min_score: Option<f64>,
    pub fail_on_violations: bool,
    pub schema: Option<&'a Path>,
    pub record: bool,
    pub repo_name: Option<&'a str>,
    pub db: Option<&'a Path>,
}

pub(super) fn run(args: ValidateArgs<'_>) -> Result<()> {
    let root = repository_root(args.path)?;
    let format = OutputFormat::from_str(args.format)?;

    let mut config = load_project_config(&root);
    if let Some(schema) = args.schema {
        let schema = schema
            .canonicalize()
            .with_context(|| format!("Schema file not found: {}", schema.display()))?;
        config.validation.schema = Some(schema);
    }

    let validator = Validator::from_config(&root, &config)
        .context("Failed to load repository schemas")?;
    let requested = args
        .repo_type
        .or(config.validation.repository_type.as_deref());
    let validation = validator
        .validate(&root, requested)
        .with_context(|| format!("Failed to validate {}", root.display()))?;
    if validation.truncated {
        warn!(
            "Snapshot of {} hit its size limits; results may be incomplete",
            root.display()
        );
    }

    let repo_id = args
        .repo_name
        .map(str::to_string)
        .unwrap_or_else(|| repository_id(&root));
    let result = &validation.result;
    println!("{}", reporters::validation(result, &repo_id, format)?);

    if args.record {
        let db = database_path(args.db.or(config.health.database.as_deref()));
        let store = RedbStore::open(&db)
            .with_context(|| format!("Failed to open health database {}", db.display()))?;
        let tracker = HealthTracker::new(Arc::new(store), config.health.trend_epsilon);
        tracker
            .record(&repo_id, result, None)
            .with_context(|| format!("Failed to record health for {}", repo_id))?;
    }

    let min_score = args.min_score.unwrap_or(config.validation.min_score);
    let fail_on_violations = args.fail_on_violations || config.validation.fail_on_violations;
    if let GateOutcome::ThresholdNotMet { reasons } = gate(result, min_score, fail_on_violations)
    {
        std::io::stdout().flush().ok();
        eprintln!(
            "{} {}",
            style("✗").red().bold(),
            style(format!("Health gate failed: {}", reasons.join("; "))).red()
        );
        for finding in &result.findings {
            eprintln!(
                "  {} {}: {}",
                style("-").dim(),
                style(&finding.check).bold(),
                finding.message
            );
            eprintln!("    {} {}", style("fix:").dim(), finding.recommendation);
        }
        std::process::exit(1);
    }
    Ok(())
}
