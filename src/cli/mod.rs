//! CLI command definitions and handlers

mod fix;
mod health;
mod init;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Score must be a fraction in [0, 1]
fn parse_score(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err("score must be between 0.0 and 1.0".to_string())
    }
}

/// repohealth - repository compliance and health tracking
#[derive(Parser, Debug)]
#[command(name = "repohealth")]
#[command(
    version,
    about = "Validate repositories against typed structure schemas, score their health and fix what is missing",
    after_help = "\
Examples:
  repohealth validate .                         Validate the current repository
  repohealth validate . --json --min-score 0.7  CI gate with the JSON contract on stdout
  repohealth fix . --dry-run                    Show the remediation plan
  repohealth fix . --safety-level caution       Apply safe and caution fixes
  repohealth health update ~/src/*              Record health for many repositories
  repohealth health dashboard --format markdown Organisation dashboard"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers for multi-repository runs (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Health database path
    #[arg(long, global = true, env = "REPOHEALTH_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a repository and report its score, level and violations
    #[command(after_help = "\
Exit codes:
  0  score meets the minimum (and no violations with --fail-on-violations)
  1  threshold not met, or the run failed")]
    Validate {
        /// Repository path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Repository type, or `auto` to detect it
        #[arg(long = "type", short = 't')]
        repo_type: Option<String>,

        /// Shorthand for --format json
        #[arg(long)]
        json: bool,

        /// Output format: text, json, markdown (or md)
        #[arg(long, short = 'f', value_parser = ["text", "json", "markdown", "md"])]
        format: Option<String>,

        /// Minimum passing score (default from repohealth.toml, else 0.7)
        #[arg(long, value_parser = parse_score)]
        min_score: Option<f64>,

        /// Fail when any violation is found, regardless of score
        #[arg(long)]
        fail_on_violations: bool,

        /// Custom schema document (JSON or TOML)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Append the result to the health database
        #[arg(long)]
        record: bool,

        /// Repository id used with --record (default: directory name)
        #[arg(long)]
        repo_name: Option<String>,
    },

    /// Plan and apply fixes for violations
    Fix {
        /// Repository path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Report what would change without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Only apply safe (purely additive) fixes
        #[arg(long, conflicts_with = "safety_level")]
        safe_only: bool,

        /// Highest safety tier to apply
        #[arg(long, value_parser = ["safe", "caution", "risky"])]
        safety_level: Option<String>,

        /// JSON report on stdout
        #[arg(long)]
        json: bool,
    },

    /// Record and report health over time
    Health {
        #[command(subcommand)]
        action: HealthAction,
    },

    /// Write an example repohealth.toml
    Init {
        /// Repository path
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum HealthAction {
    /// Validate repositories and append their results to the database
    Update {
        /// Repository paths
        #[arg(required_unless_present = "validation_result")]
        paths: Vec<PathBuf>,

        /// Repository id (single repository only; default: directory name)
        #[arg(long)]
        repo_name: Option<String>,

        /// Record a previously produced JSON validation result instead
        #[arg(long, requires = "repo_name", conflicts_with = "paths")]
        validation_result: Option<PathBuf>,
    },

    /// Organisation dashboard, worst repositories first
    Dashboard {
        /// Limit to these repositories (repeatable; default: all)
        #[arg(long)]
        repo_name: Vec<String>,

        /// Trend window in days (1-36500)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=crate::health::MAX_WINDOW_DAYS))]
        days: Option<i64>,

        /// Output format: text, json, markdown (or md), html
        #[arg(long, short = 'f', default_value = "markdown", value_parser = ["text", "json", "markdown", "md", "html"])]
        format: String,
    },

    /// Status and history for one repository
    Repository {
        #[arg(long)]
        repo_name: String,

        /// History window in days (1-36500)
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=crate::health::MAX_WINDOW_DAYS))]
        days: Option<i64>,

        /// Output format: text, json, markdown (or md), html
        #[arg(long, short = 'f', default_value = "markdown", value_parser = ["text", "json", "markdown", "md", "html"])]
        format: String,
    },
}

/// Canonical repository root, rejecting files and missing paths
fn repository_root(path: &Path) -> Result<PathBuf> {
    use anyhow::Context;
    let root = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }
    Ok(root)
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate {
            path,
            repo_type,
            json,
            format,
            min_score,
            fail_on_violations,
            schema,
            record,
            repo_name,
        } => {
            let format = if json {
                "json".to_string()
            } else {
                format.unwrap_or_else(|| "text".to_string())
            };
            validate::run(validate::ValidateArgs {
                path: &path,
                repo_type: repo_type.as_deref(),
                format: &format,
                min_score,
                fail_on_violations,
                schema: schema.as_deref(),
                record,
                repo_name: repo_name.as_deref(),
                db: cli.db.as_deref(),
            })
        }

        Commands::Fix {
            path,
            dry_run,
            safe_only,
            safety_level,
            json,
        } => fix::run(&path, dry_run, safe_only, safety_level.as_deref(), json),

        Commands::Health { action } => health::run(action, cli.db.as_deref(), cli.workers),

        Commands::Init { path } => init::run(&path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("4"), Ok(4));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("x").is_err());
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("0.7"), Ok(0.7));
        assert!(parse_score("1.5").is_err());
    }

    #[test]
    fn test_json_flag_parses() {
        let cli = Cli::try_parse_from(["repohealth", "validate", "repo", "--json", "--type", "auto"])
            .unwrap();
        match cli.command {
            Commands::Validate { json, repo_type, .. } => {
                assert!(json);
                assert_eq!(repo_type.as_deref(), Some("auto"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_days_must_be_in_range() {
        for days in ["0", "-5", "100000000", "x"] {
            assert!(Cli::try_parse_from([
                "repohealth",
                "health",
                "repository",
                "--repo-name",
                "atlas",
                "--days",
                days,
            ])
            .is_err());
            assert!(Cli::try_parse_from(["repohealth", "health", "dashboard", "--days", days]).is_err());
        }
        let cli = Cli::try_parse_from(["repohealth", "health", "dashboard", "--days", "90", "-f", "html"])
            .unwrap();
        match cli.command {
            Commands::Health {
                action: HealthAction::Dashboard { days, format, .. },
            } => {
                assert_eq!(days, Some(90));
                assert_eq!(format, "html");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_safe_only_conflicts_with_safety_level() {
        let parsed = Cli::try_parse_from([
            "repohealth",
            "fix",
            ".",
            "--safe-only",
            "--safety-level",
            "risky",
        ]);
        assert!(parsed.is_err());
    }
}
