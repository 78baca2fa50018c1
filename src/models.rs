//! Core data models for repohealth
//!
//! These types flow through the whole engine: check suites produce
//! `CheckResult`s, the scorer and violation generator turn them into a
//! `ValidationResult`, the health store persists `HealthRecord`s and the
//! remediation planner consumes `Violation`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four check categories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Structural,
    Content,
    Process,
    Security,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Structural,
        Category::Content,
        Category::Process,
        Category::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Structural => "structural",
            Category::Content => "content",
            Category::Process => "process",
            Category::Security => "security",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity ordering of violations. Lower sorts first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ViolationTier {
    MissingPath,
    Naming,
    Content,
    Advisory,
}

/// A model file that lacks one or more mandated markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerGap {
    pub path: String,
    pub missing: Vec<String>,
}

/// A secret-like match in a tracked file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretHit {
    pub path: String,
    pub line: usize,
    pub pattern: String,
}

/// What a check looked at, with enough detail to describe and fix a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    RequiredDirectory {
        path: String,
    },
    RequiredFile {
        path: String,
    },
    DirectoryCase {
        offenders: Vec<String>,
    },
    FileCase {
        offenders: Vec<String>,
    },
    ModelIdFormat {
        offenders: Vec<String>,
    },
    ReadmeLength {
        path: String,
        length: Option<usize>,
        min: usize,
    },
    ReadmeSections {
        path: String,
        has_heading: bool,
        missing: Vec<String>,
    },
    ManifestFields {
        path: String,
        missing: Vec<String>,
        invalid_category: Option<String>,
        present: bool,
        parse_error: Option<String>,
    },
    ManifestCompliance {
        path: String,
        flag: String,
    },
    ModelFileNames {
        offenders: Vec<String>,
    },
    ModelMarkers {
        gaps: Vec<MarkerGap>,
    },
    CiWorkflows,
    ValidationTools,
    AutomationScripts,
    PreCommit,
    SecurityPolicy,
    DependencyScanning,
    SecretPatterns {
        hits: Vec<SecretHit>,
    },
}

impl CheckKind {
    pub fn tier(&self) -> ViolationTier {
        match self {
            CheckKind::RequiredDirectory { .. } | CheckKind::RequiredFile { .. } => {
                ViolationTier::MissingPath
            }
            CheckKind::DirectoryCase { .. }
            | CheckKind::FileCase { .. }
            | CheckKind::ModelIdFormat { .. }
            | CheckKind::ModelFileNames { .. } => ViolationTier::Naming,
            CheckKind::ReadmeLength { .. }
            | CheckKind::ReadmeSections { .. }
            | CheckKind::ManifestFields { .. }
            | CheckKind::ManifestCompliance { .. }
            | CheckKind::ModelMarkers { .. } => ViolationTier::Content,
            CheckKind::CiWorkflows
            | CheckKind::ValidationTools
            | CheckKind::AutomationScripts
            | CheckKind::PreCommit
            | CheckKind::SecurityPolicy
            | CheckKind::DependencyScanning
            | CheckKind::SecretPatterns { .. } => ViolationTier::Advisory,
        }
    }
}

/// Outcome of a single check. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub category: Category,
    pub name: String,
    pub passed: bool,
    pub detail: String,
    #[serde(flatten)]
    pub kind: CheckKind,
}

impl CheckResult {
    pub fn pass(
        category: Category,
        name: impl Into<String>,
        detail: impl Into<String>,
        kind: CheckKind,
    ) -> Self {
        Self {
            category,
            name: name.into(),
            passed: true,
            detail: detail.into(),
            kind,
        }
    }

    pub fn fail(
        category: Category,
        name: impl Into<String>,
        detail: impl Into<String>,
        kind: CheckKind,
    ) -> Self {
        Self {
            category,
            name: name.into(),
            passed: false,
            detail: detail.into(),
            kind,
        }
    }

    /// Build a result whose outcome is decided by `passed`
    pub fn new(
        category: Category,
        name: impl Into<String>,
        passed: bool,
        detail: impl Into<String>,
        kind: CheckKind,
    ) -> Self {
        Self {
            category,
            name: name.into(),
            passed,
            detail: detail.into(),
            kind,
        }
    }
}

/// Compliance ladder position
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceLevel {
    #[default]
    NonCompliant,
    Basic,
    Structured,
    Documented,
    Tested,
    Secure,
    Exemplary,
}

impl ComplianceLevel {
    /// The six ladder levels, 0 through 5
    pub const LADDER: [ComplianceLevel; 6] = [
        ComplianceLevel::Basic,
        ComplianceLevel::Structured,
        ComplianceLevel::Documented,
        ComplianceLevel::Tested,
        ComplianceLevel::Secure,
        ComplianceLevel::Exemplary,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::LADDER.get(index).copied()
    }

    /// Ladder index, `None` for non-compliant
    pub fn index(&self) -> Option<usize> {
        Self::LADDER.iter().position(|l| l == self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceLevel::NonCompliant => "non-compliant",
            ComplianceLevel::Basic => "basic",
            ComplianceLevel::Structured => "structured",
            ComplianceLevel::Documented => "documented",
            ComplianceLevel::Tested => "tested",
            ComplianceLevel::Secure => "secure",
            ComplianceLevel::Exemplary => "exemplary",
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed check surfaced to the user with its remedy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub category: Category,
    pub check: String,
    pub tier: ViolationTier,
    pub message: String,
    pub recommendation: String,
    pub kind: CheckKind,
}

/// Per-category pass fractions, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryScores {
    pub structural: f64,
    pub content: f64,
    pub process: f64,
    pub security: f64,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Structural => self.structural,
            Category::Content => self.content,
            Category::Process => self.process,
            Category::Security => self.security,
        }
    }

    pub fn set(&mut self, category: Category, value: f64) {
        match category {
            Category::Structural => self.structural = value,
            Category::Content => self.content = value,
            Category::Process => self.process = value,
            Category::Security => self.security = value,
        }
    }
}

/// Per-category fractions plus the overall letter grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HealthMetrics {
    pub structural: f64,
    pub content: f64,
    pub process: f64,
    pub security: f64,
    pub overall_health: String,
}

impl HealthMetrics {
    pub fn new(scores: CategoryScores, grade: impl Into<String>) -> Self {
        Self {
            structural: scores.structural,
            content: scores.content,
            process: scores.process,
            security: scores.security,
            overall_health: grade.into(),
        }
    }

    pub fn scores(&self) -> CategoryScores {
        CategoryScores {
            structural: self.structural,
            content: self.content,
            process: self.process,
            security: self.security,
        }
    }
}

/// Result of one validation run. This is the JSON contract consumed by CI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository_type: String,
    pub score: f64,
    pub compliance_level: ComplianceLevel,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
    pub health_metrics: HealthMetrics,
    /// Structured violations backing the strings above
    #[serde(skip)]
    pub findings: Vec<Violation>,
}

/// One validation run of one repository. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub repo_id: String,
    pub timestamp: DateTime<Utc>,
    pub result: ValidationResult,
}

/// Score movement over a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Stable => write!(f, "stable"),
            Trend::Declining => write!(f, "declining"),
            Trend::InsufficientData => write!(f, "insufficient-data"),
        }
    }
}
