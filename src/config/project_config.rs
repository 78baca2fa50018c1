//! Repository-level configuration support
//!
//! Loads per-repository configuration from `repohealth.toml` or
//! `.repohealthrc.json` in the repository root.
//!
//! # Configuration Format
//!
//! ```toml
//! # repohealth.toml
//!
//! [validation]
//! min_score = 0.8
//! fail_on_violations = true
//! repository_type = "domains"
//!
//! [snapshot]
//! max_depth = 16
//! exclude = ["/generated/", "node_modules/", "docs/**/drafts/*.md"]
//!
//! [remediation]
//! safety_level = "caution"
//!
//! [health]
//! days = 14
//! ```

use crate::fixes::SafetyTier;
use crate::snapshot::SnapshotLimits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Preferred configuration file name
pub const CONFIG_FILE: &str = "repohealth.toml";
/// Alternative JSON configuration file name
pub const JSON_CONFIG_FILE: &str = ".repohealthrc.json";

/// Environment variable overriding the health database location
pub const DATABASE_ENV: &str = "REPOHEALTH_DB";

/// Repository-level configuration loaded from repohealth.toml or similar
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub snapshot: SnapshotLimits,

    #[serde(default)]
    pub remediation: RemediationConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

/// Gate and schema selection
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Minimum score for a passing run (default: 0.7)
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Fail the gate when any violation is reported
    #[serde(default)]
    pub fail_on_violations: bool,

    /// Explicit repository type (auto-detected if not specified)
    #[serde(default)]
    pub repository_type: Option<String>,

    /// Custom schema document, relative to the repository root
    #[serde(default)]
    pub schema: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            fail_on_violations: false,
            repository_type: None,
            schema: None,
        }
    }
}

fn default_min_score() -> f64 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemediationConfig {
    /// Highest tier applied without an explicit flag
    #[serde(default)]
    pub safety_level: SafetyTier,

    /// Backup directory, relative to the repository root
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            safety_level: SafetyTier::default(),
            backup_dir: default_backup_dir(),
        }
    }
}

fn default_backup_dir() -> String {
    ".remediation_backups".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Health database path (default: user cache dir)
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Default query window in days
    #[serde(default = "default_days")]
    pub days: i64,

    /// Minimum score change that counts as a trend
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,

    /// Workers for multi-repository updates
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            database: None,
            days: default_days(),
            trend_epsilon: default_trend_epsilon(),
            workers: None,
        }
    }
}

fn default_days() -> i64 {
    30
}
fn default_trend_epsilon() -> f64 {
    0.02
}

impl ProjectConfig {
    /// Snapshot limits with the backup directory excluded from the walk
    pub fn snapshot_limits(&self) -> SnapshotLimits {
        let mut limits = self.snapshot.clone();
        let backup = format!("/{}/", self.remediation.backup_dir.trim_matches('/'));
        if !limits.exclude.contains(&backup) {
            limits.exclude.push(backup);
        }
        limits
    }
}

/// Load repository configuration from the repository root.
///
/// Searches for configuration files in this order:
/// 1. `repohealth.toml`
/// 2. `.repohealthrc.json`
///
/// Returns default configuration if no config file is found or the file is
/// malformed.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    // Try TOML first (preferred format)
    let toml_path = repo_path.join(CONFIG_FILE);
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = repo_path.join(JSON_CONFIG_FILE);
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Health database location: explicit path > `REPOHEALTH_DB` > user cache dir
pub fn database_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(DATABASE_ENV) {
        return PathBuf::from(path);
    }
    let base = dirs::cache_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(".cache"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("repohealth").join("health.redb")
}

/// Commented example written by `repohealth init`
pub const EXAMPLE_CONFIG: &str = r#"# repohealth configuration

[validation]
# Minimum score for `repohealth validate` to exit 0
min_score = 0.7

# Also fail when any violation is reported
fail_on_violations = false

# Repository type (framework, systems, domains, works, projects, lab,
# personal, generic). Detected from fcm.manifest.json or the directory
# layout when omitted.
# repository_type = "domains"

# Custom schema document (JSON or TOML)
# schema = "schemas/fcm-repository.json"

[snapshot]
max_depth = 32
max_files = 20000
max_file_bytes = 1048576
# Gitignore-style patterns: `*` stays within a segment, `**` spans any
# number, a leading `/` anchors at the root, a trailing `/` matches directories
exclude = ["node_modules/", "vendor/", "target/", ".venv/"]

[remediation]
# Highest tier `repohealth fix` applies by default (safe, caution, risky)
safety_level = "safe"
backup_dir = ".remediation_backups"

[health]
# database = "/var/lib/repohealth/health.redb"
days = 30
trend_epsilon = 0.02
# workers = 4
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::default();
        assert!((config.validation.min_score - 0.7).abs() < 1e-9);
        assert!(!config.validation.fail_on_violations);
        assert_eq!(config.remediation.safety_level, SafetyTier::Safe);
        assert_eq!(config.remediation.backup_dir, ".remediation_backups");
        assert_eq!(config.health.days, 30);
        assert_eq!(config.snapshot.max_depth, 32);
    }

    #[test]
    fn test_example_config_parses() {
        let config: ProjectConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.snapshot.max_files, 20_000);
        assert!((config.health.trend_epsilon - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_content = r#"
[validation]
min_score = 0.9
fail_on_violations = true
repository_type = "lab"

[snapshot]
max_depth = 4

[remediation]
safety_level = "caution"
backup_dir = "backups"

[health]
days = 7
workers = 2
"#;
        let config: ProjectConfig = toml::from_str(toml_content).unwrap();
        assert!((config.validation.min_score - 0.9).abs() < 1e-9);
        assert!(config.validation.fail_on_violations);
        assert_eq!(config.validation.repository_type.as_deref(), Some("lab"));
        assert_eq!(config.snapshot.max_depth, 4);
        // Unset fields keep their defaults
        assert_eq!(config.snapshot.max_files, 20_000);
        assert_eq!(config.remediation.safety_level, SafetyTier::Caution);
        assert_eq!(config.health.days, 7);
        assert_eq!(config.health.workers, Some(2));

        let limits = config.snapshot_limits();
        assert!(limits.exclude.contains(&"/backups/".to_string()));
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[validation\nmin_score = ").unwrap();
        let config = load_project_config(dir.path());
        assert!((config.validation.min_score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(JSON_CONFIG_FILE),
            r#"{"validation": {"min_score": 0.5}}"#,
        )
        .unwrap();
        let config = load_project_config(dir.path());
        assert!((config.validation.min_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_database_path_explicit_wins() {
        let explicit = Path::new("/tmp/custom.redb");
        assert_eq!(database_path(Some(explicit)), explicit);
    }
}
