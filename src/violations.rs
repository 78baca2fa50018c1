//! Violation and recommendation generation
//!
//! Each failed check becomes one `Violation` with a message and a paired,
//! actionable recommendation. Violations are ordered by tier (missing paths,
//! naming, content, advisories), then category, then check name, so the same
//! failing inputs always produce the same list.

use crate::models::{CheckKind, CheckResult, Violation};
use std::collections::HashSet;

/// Turn failed checks into ordered, de-duplicated violations
pub fn describe(results: &[CheckResult]) -> Vec<Violation> {
    let mut seen = HashSet::new();
    let mut violations: Vec<Violation> = results
        .iter()
        .filter(|r| !r.passed)
        .filter(|r| seen.insert((r.category, r.name.as_str())))
        .map(violation)
        .collect();

    violations.sort_by(|a, b| {
        (a.tier, a.category, &a.check).cmp(&(b.tier, b.category, &b.check))
    });
    violations
}

/// Split violations into the parallel string lists of the JSON contract
pub fn messages(violations: &[Violation]) -> (Vec<String>, Vec<String>) {
    violations
        .iter()
        .map(|v| (v.message.clone(), v.recommendation.clone()))
        .unzip()
}

fn violation(result: &CheckResult) -> Violation {
    let (message, recommendation) = wording(result);
    Violation {
        category: result.category,
        check: result.name.clone(),
        tier: result.kind.tier(),
        message,
        recommendation,
        kind: result.kind.clone(),
    }
}

fn wording(result: &CheckResult) -> (String, String) {
    match &result.kind {
        CheckKind::RequiredDirectory { path } => (
            format!("missing required directory: {}", path),
            format!("create directory: {}", path),
        ),
        CheckKind::RequiredFile { path } => (
            format!("missing required file: {}", path),
            format!("create file: {}", path),
        ),
        CheckKind::DirectoryCase { offenders } => (
            format!("directory names break the naming convention: {}", offenders.join(", ")),
            "rename directories to lowercase kebab-case".to_string(),
        ),
        CheckKind::FileCase { offenders } => (
            format!("file names break the naming convention: {}", offenders.join(", ")),
            "rename files to lowercase kebab-case".to_string(),
        ),
        CheckKind::ModelIdFormat { offenders } => (
            format!("model ids do not match the id format: {}", offenders.join(", ")),
            "use dotted lowercase model ids such as fcm.domain.model".to_string(),
        ),
        CheckKind::ReadmeLength { path, length, min } => match length {
            None => (
                format!("{} is missing", path),
                format!("create {} with an overview of the repository", path),
            ),
            Some(length) => (
                format!("{} is too short ({} of {} characters)", path, length, min),
                format!("expand {} to at least {} characters", path, min),
            ),
        },
        CheckKind::ReadmeSections {
            path,
            has_heading,
            missing,
        } => {
            if !missing.is_empty() {
                (
                    format!("{} is missing sections: {}", path, missing.join(", ")),
                    missing
                        .iter()
                        .map(|s| format!("add section {} to {}", s, path))
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            } else if !has_heading {
                (
                    format!("{} has no headings", path),
                    format!("add a title heading to {}", path),
                )
            } else {
                (
                    format!("{} could not be read", path),
                    format!("create {} with a title heading", path),
                )
            }
        }
        CheckKind::ManifestFields {
            path,
            missing,
            invalid_category,
            present,
            parse_error,
        } => {
            if !present {
                (
                    format!("missing manifest: {}", path),
                    format!("create {} with type, category, name and version", path),
                )
            } else if let Some(err) = parse_error {
                (
                    format!("{} is not valid JSON: {}", path, err),
                    format!("fix the JSON syntax in {}", path),
                )
            } else if !missing.is_empty() {
                (
                    format!("{} is missing fields: {}", path, missing.join(", ")),
                    format!("add fields {} to {}", missing.join(", "), path),
                )
            } else if let Some(category) = invalid_category {
                (
                    format!("{} declares unknown category: {}", path, category),
                    format!("set category in {} to a known repository type", path),
                )
            } else {
                (
                    format!("{} failed validation: {}", path, result.detail),
                    format!("review {}", path),
                )
            }
        }
        CheckKind::ManifestCompliance { path, flag } => (
            format!("{} does not set {} to true", path, flag),
            format!("set {} to true in {} once the repository complies", flag, path),
        ),
        CheckKind::ModelFileNames { offenders } => (
            format!("model files break the naming pattern: {}", offenders.join(", ")),
            "rename model files to fcm.<name>.md".to_string(),
        ),
        CheckKind::ModelMarkers { gaps } => {
            let paths: Vec<&str> = gaps.iter().map(|g| g.path.as_str()).collect();
            let mut markers: Vec<&str> = gaps
                .iter()
                .flat_map(|g| g.missing.iter().map(String::as_str))
                .collect();
            markers.sort_unstable();
            markers.dedup();
            (
                format!("model files lack required markers: {}", paths.join(", ")),
                format!("add {} markers to each model file", markers.join(" and ")),
            )
        }
        CheckKind::CiWorkflows => (
            "no CI workflow definitions".to_string(),
            "add a validation workflow under .github/workflows".to_string(),
        ),
        CheckKind::ValidationTools => (
            "no validation tooling".to_string(),
            "add a validation/ or tools/ directory with repository checks".to_string(),
        ),
        CheckKind::AutomationScripts => (
            "no automation scripts".to_string(),
            "add a scripts/ directory or a Makefile".to_string(),
        ),
        CheckKind::PreCommit => (
            "no pre-commit integration".to_string(),
            "add .pre-commit-config.yaml".to_string(),
        ),
        CheckKind::SecurityPolicy => (
            "no security policy".to_string(),
            "create file: SECURITY.md".to_string(),
        ),
        CheckKind::DependencyScanning => (
            "no dependency scanning configuration".to_string(),
            "add .github/dependabot.yml".to_string(),
        ),
        CheckKind::SecretPatterns { hits } => {
            let locations: Vec<String> =
                hits.iter().map(|h| format!("{}:{}", h.path, h.line)).collect();
            (
                format!("possible secrets committed: {}", locations.join(", ")),
                "remove the credentials, rotate them and load them from the environment"
                    .to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ViolationTier};

    fn fail(category: Category, name: &str, kind: CheckKind) -> CheckResult {
        CheckResult::fail(category, name, "", kind)
    }

    #[test]
    fn test_ordered_by_tier() {
        let results = vec![
            fail(Category::Security, "security:policy", CheckKind::SecurityPolicy),
            fail(
                Category::Content,
                "readme:length",
                CheckKind::ReadmeLength {
                    path: "README.md".into(),
                    length: Some(12),
                    min: 100,
                },
            ),
            fail(
                Category::Structural,
                "required_dir:schemas",
                CheckKind::RequiredDirectory {
                    path: "schemas".into(),
                },
            ),
            CheckResult::pass(
                Category::Structural,
                "required_dir:models",
                "",
                CheckKind::RequiredDirectory {
                    path: "models".into(),
                },
            ),
        ];
        let violations = describe(&results);
        let tiers: Vec<ViolationTier> = violations.iter().map(|v| v.tier).collect();
        assert_eq!(
            tiers,
            vec![
                ViolationTier::MissingPath,
                ViolationTier::Content,
                ViolationTier::Advisory
            ]
        );
        assert_eq!(violations[0].message, "missing required directory: schemas");
        assert_eq!(violations[0].recommendation, "create directory: schemas");
        assert_eq!(
            violations[1].message,
            "README.md is too short (12 of 100 characters)"
        );
    }

    #[test]
    fn test_duplicates_merged() {
        let kind = CheckKind::RequiredFile {
            path: "LICENSE".into(),
        };
        let results = vec![
            fail(Category::Structural, "required_file:LICENSE", kind.clone()),
            fail(Category::Structural, "required_file:LICENSE", kind),
        ];
        assert_eq!(describe(&results).len(), 1);
    }

    #[test]
    fn test_stable_for_permuted_input() {
        let a = fail(
            Category::Structural,
            "required_dir:a",
            CheckKind::RequiredDirectory { path: "a".into() },
        );
        let b = fail(
            Category::Structural,
            "required_dir:b",
            CheckKind::RequiredDirectory { path: "b".into() },
        );
        let first = describe(&[a.clone(), b.clone()]);
        let second = describe(&[b, a]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_section_recommendations() {
        let results = vec![fail(
            Category::Content,
            "readme:sections",
            CheckKind::ReadmeSections {
                path: "README.md".into(),
                has_heading: true,
                missing: vec!["Usage".into()],
            },
        )];
        let (messages, recommendations) = messages(&describe(&results));
        assert_eq!(messages, vec!["README.md is missing sections: Usage"]);
        assert_eq!(recommendations, vec!["add section Usage to README.md"]);
    }
}
