//! Repository-type schemas
//!
//! A schema document is data, not code:
//!
//! ```json
//! {
//!   "defaults": { "required_files": ["README.md"], "weights": { ... }, "ladder": [ ... ] },
//!   "repository_schemas": {
//!     "domains": { "required_directories": ["models", "schemas"] }
//!   }
//! }
//! ```
//!
//! Each repository type is the `defaults` object deep-merged with its own
//! entry (objects merge key by key, arrays and scalars replace). The built-in
//! document is embedded at compile time; `--schema FILE` loads another one.

mod registry;
mod requirement;

pub use registry::{SchemaRegistry, BUILTIN_SCHEMA, FALLBACK_TYPE};
pub use requirement::{Evaluation, Requirement};

use crate::models::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Check names produced by the rule evaluator
pub mod check_names {
    pub const DIRECTORY_CASE: &str = "naming:directory_case";
    pub const FILE_CASE: &str = "naming:file_case";
    pub const MODEL_ID: &str = "naming:model_id";
    pub const README_LENGTH: &str = "readme:length";
    pub const README_SECTIONS: &str = "readme:sections";
    pub const MANIFEST_FIELDS: &str = "manifest:fields";
    pub const MANIFEST_COMPLIANCE: &str = "manifest:compliance";
    pub const MODELS_NAMING: &str = "models:naming";
    pub const MODELS_MARKERS: &str = "models:markers";
    pub const CI_WORKFLOWS: &str = "process:ci_workflows";
    pub const VALIDATION_TOOLS: &str = "process:validation_tools";
    pub const AUTOMATION: &str = "process:automation";
    pub const PRE_COMMIT: &str = "process:pre_commit";
    pub const SECURITY_POLICY: &str = "security:policy";
    pub const DEPENDENCY_SCANNING: &str = "security:dependency_scanning";
    pub const SECRETS: &str = "security:secrets";

    pub fn required_dir(path: &str) -> String {
        format!("required_dir:{}", path)
    }

    pub fn required_file(path: &str) -> String {
        format!("required_file:{}", path)
    }
}

/// One fully resolved repository type. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryTypeSchema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required_directories: Vec<String>,
    #[serde(default)]
    pub required_files: Vec<String>,
    #[serde(default)]
    pub naming: NamingRules,
    #[serde(default)]
    pub content: ContentRules,
    #[serde(default)]
    pub process: ProcessRules,
    #[serde(default)]
    pub security: SecurityRules,
    #[serde(default)]
    pub weights: CategoryWeights,
    #[serde(default)]
    pub ladder: Vec<LevelSpec>,
}

impl RepositoryTypeSchema {
    /// Every check name a run against this schema produces, in evaluation order
    pub fn check_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        names.extend(
            self.required_directories
                .iter()
                .map(|d| check_names::required_dir(d)),
        );
        names.extend(self.required_files.iter().map(|f| check_names::required_file(f)));
        names.extend(
            [
                check_names::DIRECTORY_CASE,
                check_names::FILE_CASE,
                check_names::MODEL_ID,
                check_names::README_LENGTH,
                check_names::README_SECTIONS,
                check_names::MANIFEST_FIELDS,
                check_names::MANIFEST_COMPLIANCE,
                check_names::MODELS_NAMING,
                check_names::MODELS_MARKERS,
                check_names::CI_WORKFLOWS,
                check_names::VALIDATION_TOOLS,
                check_names::AUTOMATION,
                check_names::PRE_COMMIT,
                check_names::SECURITY_POLICY,
                check_names::DEPENDENCY_SCANNING,
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        if self.security.scan_secrets {
            names.push(check_names::SECRETS.to_string());
        }
        names
    }

    pub fn requires_file(&self, path: &str) -> bool {
        self.required_files.iter().any(|f| f == path)
    }
}

/// Naming conventions. Patterns are regular expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingRules {
    #[serde(default = "default_directory_pattern")]
    pub directory_pattern: String,
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// File names exempt from `file_pattern`
    #[serde(default)]
    pub file_exemptions: Vec<String>,
    #[serde(default = "default_model_id_pattern")]
    pub model_id_pattern: String,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            directory_pattern: default_directory_pattern(),
            file_pattern: default_file_pattern(),
            file_exemptions: Vec::new(),
            model_id_pattern: default_model_id_pattern(),
        }
    }
}

fn default_directory_pattern() -> String {
    "^[a-z0-9._-]+$".to_string()
}
fn default_file_pattern() -> String {
    "^[a-z0-9][a-z0-9._-]*$".to_string()
}
fn default_model_id_pattern() -> String {
    r"^[a-z]+\.[a-z]+.*".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContentRules {
    #[serde(default)]
    pub readme: ReadmeRules,
    #[serde(default)]
    pub manifest: ManifestRules,
    #[serde(default)]
    pub models: ModelRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadmeRules {
    #[serde(default = "default_readme_path")]
    pub path: String,
    #[serde(default = "default_readme_min_length")]
    pub min_length: usize,
    /// Section headings that must appear, matched case-insensitively
    #[serde(default)]
    pub sections: Vec<String>,
}

impl Default for ReadmeRules {
    fn default() -> Self {
        Self {
            path: default_readme_path(),
            min_length: default_readme_min_length(),
            sections: Vec::new(),
        }
    }
}

fn default_readme_path() -> String {
    "README.md".to_string()
}
fn default_readme_min_length() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRules {
    #[serde(default = "default_manifest_path")]
    pub path: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Field naming the repository type, also used for detection
    #[serde(default = "default_category_field")]
    pub category_field: String,
    #[serde(default)]
    pub valid_categories: Vec<String>,
    /// Dotted path to a boolean that must be true
    #[serde(default)]
    pub compliance_flag: Option<String>,
}

impl Default for ManifestRules {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            required_fields: Vec::new(),
            category_field: default_category_field(),
            valid_categories: Vec::new(),
            compliance_flag: None,
        }
    }
}

fn default_manifest_path() -> String {
    "fcm.manifest.json".to_string()
}
fn default_category_field() -> String {
    "category".to_string()
}

/// A structural marker that must appear in every model file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRule {
    pub name: String,
    /// Any one of these substrings satisfies the marker
    pub any_of: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRules {
    #[serde(default = "default_model_prefix")]
    pub prefix: String,
    #[serde(default = "default_model_suffix")]
    pub suffix: String,
    #[serde(default = "default_model_name_pattern")]
    pub name_pattern: String,
    /// Whether at least one model file must exist
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub markers: Vec<MarkerRule>,
}

impl Default for ModelRules {
    fn default() -> Self {
        Self {
            prefix: default_model_prefix(),
            suffix: default_model_suffix(),
            name_pattern: default_model_name_pattern(),
            required: false,
            markers: Vec::new(),
        }
    }
}

fn default_model_prefix() -> String {
    "fcm.".to_string()
}
fn default_model_suffix() -> String {
    ".md".to_string()
}
fn default_model_name_pattern() -> String {
    r"^fcm\.[a-z]+(-[a-z]+)*\.md$".to_string()
}

impl ModelRules {
    /// Whether a file name looks like a model document
    pub fn is_model_file(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.prefix) && file_name.ends_with(&self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRules {
    #[serde(default = "default_workflow_dir")]
    pub workflow_dir: String,
    #[serde(default = "default_workflow_extensions")]
    pub workflow_extensions: Vec<String>,
    #[serde(default)]
    pub validation_paths: Vec<String>,
    #[serde(default)]
    pub automation_paths: Vec<String>,
    #[serde(default)]
    pub pre_commit_paths: Vec<String>,
}

impl Default for ProcessRules {
    fn default() -> Self {
        Self {
            workflow_dir: default_workflow_dir(),
            workflow_extensions: default_workflow_extensions(),
            validation_paths: Vec::new(),
            automation_paths: Vec::new(),
            pre_commit_paths: Vec::new(),
        }
    }
}

fn default_workflow_dir() -> String {
    ".github/workflows".to_string()
}
fn default_workflow_extensions() -> Vec<String> {
    vec!["yml".to_string(), "yaml".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRules {
    #[serde(default)]
    pub policy_files: Vec<String>,
    #[serde(default)]
    pub dependency_scanning_files: Vec<String>,
    #[serde(default = "default_true")]
    pub scan_secrets: bool,
}

impl Default for SecurityRules {
    fn default() -> Self {
        Self {
            policy_files: Vec::new(),
            dependency_scanning_files: Vec::new(),
            scan_secrets: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Weights for the four check categories (must sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    #[serde(default = "default_structural_weight")]
    pub structural: f64,
    #[serde(default = "default_content_weight")]
    pub content: f64,
    #[serde(default = "default_process_weight")]
    pub process: f64,
    #[serde(default = "default_security_weight")]
    pub security: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            structural: default_structural_weight(),
            content: default_content_weight(),
            process: default_process_weight(),
            security: default_security_weight(),
        }
    }
}

fn default_structural_weight() -> f64 {
    0.3
}
fn default_content_weight() -> f64 {
    0.3
}
fn default_process_weight() -> f64 {
    0.2
}
fn default_security_weight() -> f64 {
    0.2
}

/// Tolerance for the weight sum
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

impl CategoryWeights {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Structural => self.structural,
            Category::Content => self.content,
            Category::Process => self.process,
            Category::Security => self.security,
        }
    }

    pub fn sum(&self) -> f64 {
        self.structural + self.content + self.process + self.security
    }

    /// Validate that weights sum to 1.0 and none is negative
    pub fn is_valid(&self) -> bool {
        Category::ALL.iter().all(|c| self.get(*c) >= 0.0)
            && (self.sum() - 1.0).abs() <= WEIGHT_TOLERANCE
    }
}

/// One rung of the compliance ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub name: String,
    #[serde(default)]
    pub requirements: BTreeMap<String, Requirement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_validation() {
        assert!(CategoryWeights::default().is_valid());
        let bad = CategoryWeights {
            structural: 0.5,
            content: 0.5,
            process: 0.5,
            security: 0.0,
        };
        assert!(!bad.is_valid());
        let negative = CategoryWeights {
            structural: 1.2,
            content: -0.2,
            process: 0.0,
            security: 0.0,
        };
        assert!(!negative.is_valid());
    }

    #[test]
    fn test_model_file_detection() {
        let rules = ModelRules::default();
        assert!(rules.is_model_file("fcm.decision-making.md"));
        assert!(rules.is_model_file("fcm.Bad_Name.md"));
        assert!(!rules.is_model_file("fcm.manifest.json"));
        assert!(!rules.is_model_file("README.md"));
    }

    #[test]
    fn test_check_names_follow_required_paths() {
        let schema = RepositoryTypeSchema {
            name: "domains".into(),
            required_directories: vec!["models".into(), "schemas".into()],
            required_files: vec!["README.md".into()],
            naming: NamingRules::default(),
            content: ContentRules::default(),
            process: ProcessRules::default(),
            security: SecurityRules::default(),
            weights: CategoryWeights::default(),
            ladder: Vec::new(),
        };
        let names = schema.check_names();
        assert_eq!(names[0], "required_dir:models");
        assert_eq!(names[1], "required_dir:schemas");
        assert_eq!(names[2], "required_file:README.md");
        assert!(names.contains(&"security:secrets".to_string()));
    }
}
