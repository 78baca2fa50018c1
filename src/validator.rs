//! End-to-end validation of one repository
//!
//! ```text
//! ProjectConfig → SchemaRegistry → RepositorySnapshot → checks::evaluate
//!              → scoring::aggregate → scoring::classify → violations::describe
//! ```

use crate::checks;
use crate::config::ProjectConfig;
use crate::error::Result;
use crate::models::{CheckResult, HealthMetrics, ValidationResult};
use crate::schema::{RepositoryTypeSchema, SchemaRegistry};
use crate::scoring;
use crate::snapshot::{RepositorySnapshot, SnapshotLimits};
use crate::violations;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Everything one run produced. `result` is the public contract; `checks`
/// and `schema` feed remediation and detailed reports.
#[derive(Debug, Clone)]
pub struct Validation {
    pub result: ValidationResult,
    pub checks: Vec<CheckResult>,
    pub schema: RepositoryTypeSchema,
    pub truncated: bool,
}

pub struct Validator {
    registry: SchemaRegistry,
    limits: SnapshotLimits,
}

impl Validator {
    pub fn new(registry: SchemaRegistry, limits: SnapshotLimits) -> Self {
        Self { registry, limits }
    }

    /// Build a validator from a repository's configuration. A custom schema
    /// path is resolved against the repository root when relative.
    pub fn from_config(root: &Path, config: &ProjectConfig) -> Result<Self> {
        let registry = match &config.validation.schema {
            Some(path) if path.is_relative() => SchemaRegistry::from_path(&root.join(path))?,
            Some(path) => SchemaRegistry::from_path(path)?,
            None => SchemaRegistry::builtin()?,
        };
        Ok(Self::new(registry, config.snapshot_limits()))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Capture `root` and validate it against the requested type
    /// (`None` or `auto` detects the type)
    pub fn validate(&self, root: &Path, requested: Option<&str>) -> Result<Validation> {
        let snapshot = RepositorySnapshot::capture(root, &self.limits)?;
        for path in snapshot.unreadable() {
            warn!("Unreadable path during capture: {}", path);
        }
        self.validate_snapshot(&snapshot, requested)
    }

    pub fn validate_snapshot(
        &self,
        snapshot: &RepositorySnapshot,
        requested: Option<&str>,
    ) -> Result<Validation> {
        let start = Instant::now();
        let schema = self.registry.resolve(requested, snapshot)?;

        let checks = checks::evaluate(snapshot, schema);
        let (score, scores) = scoring::aggregate(&checks, &schema.weights);
        let compliance_level = scoring::classify(&checks, score, scores, &schema.ladder);
        let findings = violations::describe(&checks);
        let (violations, recommendations) = violations::messages(&findings);

        let grade = scoring::grade(score);
        info!(
            "Validated as '{}': score {:.2} ({}), level {}, {} violation(s) in {:?}",
            schema.name,
            score,
            grade,
            compliance_level,
            findings.len(),
            start.elapsed()
        );

        Ok(Validation {
            result: ValidationResult {
                repository_type: schema.name.clone(),
                score,
                compliance_level,
                violations,
                recommendations,
                health_metrics: HealthMetrics::new(scores, grade),
                findings,
            },
            checks,
            schema: schema.clone(),
            truncated: snapshot.is_truncated(),
        })
    }
}

/// Validate a repository with its own configuration, overriding the
/// configured type when `requested` is given
pub fn validate_repository(root: &Path, requested: Option<&str>) -> Result<Validation> {
    let config = crate::config::load_project_config(root);
    let validator = Validator::from_config(root, &config)?;
    let requested = requested.or(config.validation.repository_type.as_deref());
    validator.validate(root, requested)
}

/// Repository identity: the directory name of the canonical path
pub fn repository_id(root: &Path) -> String {
    let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string())
}

/// Result of the pass/fail gate applied to a validation result
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Passed,
    /// Not an error: the run completed but did not meet the configured bar
    ThresholdNotMet { reasons: Vec<String> },
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, GateOutcome::Passed)
    }
}

pub fn gate(result: &ValidationResult, min_score: f64, fail_on_violations: bool) -> GateOutcome {
    let mut reasons = Vec::new();
    if result.score < min_score {
        reasons.push(format!(
            "score {:.2} is below the minimum {:.2}",
            result.score, min_score
        ));
    }
    if fail_on_violations && !result.violations.is_empty() {
        reasons.push(format!("{} violation(s) found", result.violations.len()));
    }

    if reasons.is_empty() {
        GateOutcome::Passed
    } else {
        GateOutcome::ThresholdNotMet { reasons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::tests::{GOOD_MANIFEST, GOOD_README};
    use crate::models::ComplianceLevel;
    use std::fs;
    use tempfile::TempDir;

    fn domains_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("models")).unwrap();
        fs::write(dir.path().join("README.md"), GOOD_README).unwrap();
        fs::write(dir.path().join("fcm.manifest.json"), GOOD_MANIFEST).unwrap();
        dir
    }

    #[test]
    fn test_validate_detects_type_from_manifest() {
        let repo = domains_repo();
        let validation = validate_repository(repo.path(), None).unwrap();
        let result = &validation.result;
        assert_eq!(result.repository_type, "domains");
        assert_eq!(result.compliance_level, ComplianceLevel::Basic);
        assert_eq!(result.violations[0], "missing required directory: schemas");
        assert_eq!(result.recommendations[0], "create directory: schemas");
        assert_eq!(result.violations.len(), result.recommendations.len());
        assert_eq!(result.health_metrics.content, 1.0);
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let repo = domains_repo();
        let err = validate_repository(repo.path(), Some("nonsense")).unwrap_err();
        assert!(err.to_string().contains("nonsense"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(validate_repository(&dir.path().join("absent"), None).is_err());
    }

    #[test]
    fn test_configured_type_used() {
        let repo = domains_repo();
        fs::write(
            repo.path().join("repohealth.toml"),
            "[validation]\nrepository_type = \"lab\"\n",
        )
        .unwrap();
        let validation = validate_repository(repo.path(), None).unwrap();
        assert_eq!(validation.result.repository_type, "lab");
    }

    #[test]
    fn test_gate() {
        let result = ValidationResult {
            score: 0.65,
            violations: vec!["missing required directory: schemas".into()],
            ..Default::default()
        };
        assert!(gate(&result, 0.6, false).passed());
        match gate(&result, 0.7, true) {
            GateOutcome::ThresholdNotMet { reasons } => assert_eq!(reasons.len(), 2),
            GateOutcome::Passed => panic!("expected failure"),
        }
    }
}
