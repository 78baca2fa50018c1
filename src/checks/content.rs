//! Content checks: README, manifest and model documents
//!
//! Only structural presence and patterns are checked, never whether the
//! prose itself is any good.

use super::{file_name, preview, CheckSuite};
use crate::models::{Category, CheckKind, CheckResult, MarkerGap};
use crate::schema::{check_names, MarkerRule, ReadmeRules, RepositoryTypeSchema};
use crate::snapshot::RepositorySnapshot;
use regex::Regex;
use serde_json::Value;

pub struct ContentSuite;

impl CheckSuite for ContentSuite {
    fn category(&self) -> Category {
        Category::Content
    }

    fn run(
        &self,
        snapshot: &RepositorySnapshot,
        schema: &RepositoryTypeSchema,
    ) -> Vec<CheckResult> {
        let (length, sections) = readme_checks(snapshot, &schema.content.readme);
        let (fields, compliance) = manifest_checks(snapshot, schema);
        let (naming, markers) = model_checks(snapshot, schema);
        vec![length, sections, fields, compliance, naming, markers]
    }
}

/// What a README lacks relative to its rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeGaps {
    pub length: usize,
    pub has_heading: bool,
    pub missing_sections: Vec<String>,
}

/// Markdown heading texts, lowercased, without the leading `#`s
fn headings(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_start)
        .filter(|l| l.starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_lowercase())
        .collect()
}

pub fn readme_gaps(content: &str, rules: &ReadmeRules) -> ReadmeGaps {
    let found = headings(content);
    let missing_sections = rules
        .sections
        .iter()
        .filter(|section| {
            let wanted = section.to_lowercase();
            !found.iter().any(|h| h == &wanted || h.starts_with(&format!("{} ", wanted)))
        })
        .cloned()
        .collect();
    ReadmeGaps {
        length: content.chars().count(),
        has_heading: !found.is_empty(),
        missing_sections,
    }
}

fn readme_checks(snapshot: &RepositorySnapshot, rules: &ReadmeRules) -> (CheckResult, CheckResult) {
    let path = rules.path.clone();

    let content = if snapshot.has_file(&path) {
        snapshot.read(&path).map_err(|e| e.to_string())
    } else {
        Err(format!("{} not found", path))
    };

    match content {
        Ok(content) => {
            let gaps = readme_gaps(&content, rules);
            let length = CheckResult::new(
                Category::Content,
                check_names::README_LENGTH,
                gaps.length >= rules.min_length,
                format!("{} characters (minimum {})", gaps.length, rules.min_length),
                CheckKind::ReadmeLength {
                    path: path.clone(),
                    length: Some(gaps.length),
                    min: rules.min_length,
                },
            );
            let sections_ok = gaps.has_heading && gaps.missing_sections.is_empty();
            let detail = if sections_ok {
                "required sections present".to_string()
            } else if !gaps.has_heading {
                "no markdown headings".to_string()
            } else {
                format!("missing sections: {}", gaps.missing_sections.join(", "))
            };
            let sections = CheckResult::new(
                Category::Content,
                check_names::README_SECTIONS,
                sections_ok,
                detail,
                CheckKind::ReadmeSections {
                    path,
                    has_heading: gaps.has_heading,
                    missing: gaps.missing_sections,
                },
            );
            (length, sections)
        }
        Err(reason) => (
            CheckResult::fail(
                Category::Content,
                check_names::README_LENGTH,
                reason.clone(),
                CheckKind::ReadmeLength {
                    path: path.clone(),
                    length: None,
                    min: rules.min_length,
                },
            ),
            CheckResult::fail(
                Category::Content,
                check_names::README_SECTIONS,
                reason,
                CheckKind::ReadmeSections {
                    path,
                    has_heading: false,
                    missing: rules.sections.clone(),
                },
            ),
        ),
    }
}

/// Look up a dotted path such as `quality.fcm-compliance`
pub(crate) fn lookup<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted.split('.').try_fold(value, |v, key| v.get(key))
}

fn manifest_checks(
    snapshot: &RepositorySnapshot,
    schema: &RepositoryTypeSchema,
) -> (CheckResult, CheckResult) {
    let rules = &schema.content.manifest;
    let path = rules.path.clone();
    let required = schema.requires_file(&path);

    let flag = rules.compliance_flag.clone().unwrap_or_default();
    let compliance_kind = CheckKind::ManifestCompliance {
        path: path.clone(),
        flag: flag.clone(),
    };

    if !snapshot.has_file(&path) {
        let fields_kind = CheckKind::ManifestFields {
            path: path.clone(),
            missing: rules.required_fields.clone(),
            invalid_category: None,
            present: false,
            parse_error: None,
        };
        if required {
            let reason = format!("{} not found", path);
            return (
                CheckResult::fail(
                    Category::Content,
                    check_names::MANIFEST_FIELDS,
                    reason.clone(),
                    fields_kind,
                ),
                CheckResult::fail(
                    Category::Content,
                    check_names::MANIFEST_COMPLIANCE,
                    reason,
                    compliance_kind,
                ),
            );
        }
        let reason = format!("{} not required", path);
        return (
            CheckResult::pass(
                Category::Content,
                check_names::MANIFEST_FIELDS,
                reason.clone(),
                fields_kind,
            ),
            CheckResult::pass(
                Category::Content,
                check_names::MANIFEST_COMPLIANCE,
                reason,
                compliance_kind,
            ),
        );
    }

    let parsed = snapshot
        .read(&path)
        .map_err(|e| e.to_string())
        .and_then(|c| serde_json::from_str::<Value>(&c).map_err(|e| e.to_string()));

    let manifest = match parsed {
        Ok(manifest) => manifest,
        Err(reason) => {
            return (
                CheckResult::fail(
                    Category::Content,
                    check_names::MANIFEST_FIELDS,
                    format!("invalid manifest: {}", reason),
                    CheckKind::ManifestFields {
                        path,
                        missing: Vec::new(),
                        invalid_category: None,
                        present: true,
                        parse_error: Some(reason.clone()),
                    },
                ),
                CheckResult::fail(
                    Category::Content,
                    check_names::MANIFEST_COMPLIANCE,
                    format!("invalid manifest: {}", reason),
                    compliance_kind,
                ),
            );
        }
    };

    let missing: Vec<String> = rules
        .required_fields
        .iter()
        .filter(|f| lookup(&manifest, f).is_none())
        .cloned()
        .collect();
    let invalid_category = match manifest.get(&rules.category_field) {
        Some(Value::String(c))
            if !rules.valid_categories.is_empty() && !rules.valid_categories.contains(c) =>
        {
            Some(c.clone())
        }
        Some(other) if !other.is_string() => Some(other.to_string()),
        _ => None,
    };

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing fields: {}", missing.join(", ")));
    }
    if let Some(c) = &invalid_category {
        problems.push(format!("unknown category {}", c));
    }
    let fields = CheckResult::new(
        Category::Content,
        check_names::MANIFEST_FIELDS,
        problems.is_empty(),
        if problems.is_empty() {
            "all required fields present".to_string()
        } else {
            problems.join("; ")
        },
        CheckKind::ManifestFields {
            path: path.clone(),
            missing,
            invalid_category,
            present: true,
            parse_error: None,
        },
    );

    let compliance = match rules.compliance_flag.as_deref() {
        None => CheckResult::pass(
            Category::Content,
            check_names::MANIFEST_COMPLIANCE,
            "no compliance flag declared",
            compliance_kind,
        ),
        Some(flag) => {
            let value = lookup(&manifest, flag);
            let ok = matches!(value, Some(Value::Bool(true)));
            let detail = match value {
                Some(v) => format!("{} = {}", flag, v),
                None => format!("{} not set", flag),
            };
            CheckResult::new(
                Category::Content,
                check_names::MANIFEST_COMPLIANCE,
                ok,
                detail,
                compliance_kind,
            )
        }
    };

    (fields, compliance)
}

/// Names of markers absent from a model document
pub fn missing_markers(content: &str, markers: &[MarkerRule]) -> Vec<String> {
    markers
        .iter()
        .filter(|m| !m.any_of.iter().any(|needle| content.contains(needle.as_str())))
        .map(|m| m.name.clone())
        .collect()
}

fn model_checks(
    snapshot: &RepositorySnapshot,
    schema: &RepositoryTypeSchema,
) -> (CheckResult, CheckResult) {
    let rules = &schema.content.models;
    let models: Vec<&str> = snapshot
        .files()
        .filter(|f| rules.is_model_file(file_name(f)))
        .collect();

    if models.is_empty() {
        let detail = "no model files found";
        return (
            CheckResult::new(
                Category::Content,
                check_names::MODELS_NAMING,
                !rules.required,
                detail,
                CheckKind::ModelFileNames { offenders: vec![] },
            ),
            CheckResult::new(
                Category::Content,
                check_names::MODELS_MARKERS,
                !rules.required,
                detail,
                CheckKind::ModelMarkers { gaps: vec![] },
            ),
        );
    }

    let naming = match Regex::new(&rules.name_pattern) {
        Ok(re) => {
            let offenders: Vec<String> = models
                .iter()
                .filter(|f| !re.is_match(file_name(f)))
                .map(|f| f.to_string())
                .collect();
            let detail = if offenders.is_empty() {
                format!("{} model file(s) named correctly", models.len())
            } else {
                format!("not matching {}: {}", rules.name_pattern, preview(&offenders))
            };
            CheckResult::new(
                Category::Content,
                check_names::MODELS_NAMING,
                offenders.is_empty(),
                detail,
                CheckKind::ModelFileNames { offenders },
            )
        }
        Err(e) => CheckResult::fail(
            Category::Content,
            check_names::MODELS_NAMING,
            format!("invalid pattern {}: {}", rules.name_pattern, e),
            CheckKind::ModelFileNames { offenders: vec![] },
        ),
    };

    let mut gaps = Vec::new();
    for model in &models {
        let missing = match snapshot.read(model) {
            Ok(content) => missing_markers(&content, &rules.markers),
            Err(e) => vec![format!("unreadable ({})", e)],
        };
        if !missing.is_empty() {
            gaps.push(MarkerGap {
                path: model.to_string(),
                missing,
            });
        }
    }
    let detail = if gaps.is_empty() {
        format!("{} model file(s) carry all markers", models.len())
    } else {
        let listed: Vec<String> = gaps
            .iter()
            .map(|g| format!("{} ({})", g.path, g.missing.join(", ")))
            .collect();
        format!("missing markers: {}", preview(&listed))
    };
    let markers = CheckResult::new(
        Category::Content,
        check_names::MODELS_MARKERS,
        gaps.is_empty(),
        detail,
        CheckKind::ModelMarkers { gaps },
    );

    (naming, markers)
}
