//! Health commands: record runs, dashboards and per-repository reports

use super::{repository_root, HealthAction};
use crate::config::{database_path, load_project_config, ProjectConfig};
use crate::health::{HealthTracker, RedbStore, SingleWriter, WriteRequest};
use crate::models::ValidationResult;
use crate::reporters::{self, OutputFormat};
use crate::validator::{repository_id, validate_repository};
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub(super) fn run(action: HealthAction, db: Option<&Path>, workers: Option<usize>) -> Result<()> {
    // Organisation-level defaults come from the working directory's config
    let config = load_project_config(Path::new("."));
    let db = database_path(db.or(config.health.database.as_deref()));
    let store = RedbStore::open(&db)
        .with_context(|| format!("Failed to open health database {}", db.display()))?;
    let tracker = Arc::new(HealthTracker::new(
        Arc::new(store),
        config.health.trend_epsilon,
    ));

    match action {
        HealthAction::Update {
            paths,
            repo_name,
            validation_result,
        } => match validation_result {
            Some(file) => {
                let repo_id = repo_name.context("--repo-name is required with --validation-result")?;
                ingest(&tracker, &config, &file, &repo_id)
            }
            None => update(&tracker, &config, &paths, repo_name, workers),
        },
        HealthAction::Dashboard {
            repo_name,
            days,
            format,
        } => {
            let days = days.unwrap_or(config.health.days);
            let dashboard = tracker
                .dashboard(&repo_name, days)
                .context("Failed to build dashboard")?;
            println!(
                "{}",
                reporters::dashboard(&dashboard, OutputFormat::from_str(&format)?)?
            );
            Ok(())
        }
        HealthAction::Repository {
            repo_name,
            days,
            format,
        } => {
            let days = days.unwrap_or(config.health.days);
            let report = tracker
                .repository_report(&repo_name, days)
                .with_context(|| format!("Failed to read history for {}", repo_name))?
                .with_context(|| format!("No health records for '{}'", repo_name))?;
            println!(
                "{}",
                reporters::repository(&report, OutputFormat::from_str(&format)?)?
            );
            Ok(())
        }
    }
}

fn print_recorded(tracker: &HealthTracker, config: &ProjectConfig, repo_id: &str, score: f64, grade: &str) {
    let trend = tracker
        .trend(repo_id, Some(config.health.days))
        .map(|t| t.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    println!(
        "{} {:<30} {:.2}  {:<2}  {}",
        style("✓").green(),
        repo_id,
        score,
        grade,
        style(trend).dim()
    );
}

/// Record a result produced by an earlier `validate --json`
fn ingest(tracker: &HealthTracker, config: &ProjectConfig, file: &Path, repo_id: &str) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let result: ValidationResult = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a validation result", file.display()))?;
    let record = tracker
        .record(repo_id, &result, None)
        .with_context(|| format!("Failed to record health for {}", repo_id))?;
    print_recorded(
        tracker,
        config,
        repo_id,
        record.result.score,
        &record.result.health_metrics.overall_health,
    );
    Ok(())
}

/// Validate every path in a bounded pool; one writer thread appends
fn update(
    tracker: &Arc<HealthTracker>,
    config: &ProjectConfig,
    paths: &[PathBuf],
    repo_name: Option<String>,
    workers: Option<usize>,
) -> Result<()> {
    if repo_name.is_some() && paths.len() > 1 {
        anyhow::bail!("--repo-name can only be used with a single repository path");
    }

    let workers = workers.or(config.health.workers).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("█▓▒░  "),
    );

    let writer = SingleWriter::spawn(Arc::clone(tracker));
    let sender = writer.sender();
    let failures: Vec<(String, String)> = pool.install(|| {
        paths
            .par_iter()
            .filter_map(|path| {
                let outcome = validate_one(path, repo_name.as_deref());
                bar.inc(1);
                match outcome {
                    Ok((repo_id, result)) => {
                        bar.set_message(repo_id.clone());
                        match sender.send(WriteRequest { repo_id: repo_id.clone(), result }) {
                            Ok(()) => None,
                            Err(_) => Some((repo_id, "health writer stopped".to_string())),
                        }
                    }
                    Err((label, e)) => {
                        warn!("Failed to validate {}: {:#}", label, e);
                        Some((label, format!("{:#}", e)))
                    }
                }
            })
            .collect()
    });
    drop(sender);
    bar.finish_and_clear();

    let outcomes = writer.finish();
    let mut failed = failures.len();
    for outcome in &outcomes {
        match &outcome.outcome {
            Ok(record) => print_recorded(
                tracker,
                config,
                &outcome.repo_id,
                record.result.score,
                &record.result.health_metrics.overall_health,
            ),
            Err(e) => {
                failed += 1;
                println!("{} {:<30} {}", style("✗").red(), outcome.repo_id, style(e).red());
            }
        }
    }
    for (label, e) in &failures {
        println!("{} {:<30} {}", style("✗").red(), label, style(e).red());
    }

    info!("Recorded {} of {} repositories", paths.len() - failed, paths.len());
    if failed > 0 {
        anyhow::bail!("{} of {} repositories failed", failed, paths.len());
    }
    Ok(())
}

fn validate_one(
    path: &Path,
    repo_name: Option<&str>,
) -> std::result::Result<(String, ValidationResult), (String, anyhow::Error)> {
    let label = path.display().to_string();
    let root = repository_root(path).map_err(|e| (label.clone(), e))?;
    let repo_id = repo_name
        .map(str::to_string)
        .unwrap_or_else(|| repository_id(&root));
    let validation = validate_repository(&root, None)
        .map_err(|e| (repo_id.clone(), anyhow::Error::new(e)))?;
    Ok((repo_id, validation.result))
}
