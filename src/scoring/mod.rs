//! Score aggregation and compliance-level classification
//!
//! # Scoring Formula
//!
//! ```text
//! fraction_c = passed_c / checks_c          (1.0 when a category has no checks)
//! score      = Σ weight_c × fraction_c      (weights sum to 1.0)
//! ```
//!
//! # Classification
//!
//! The ladder is walked from level 5 down to level 0. The first level whose
//! requirements all hold is returned; if level 0 fails the repository is
//! `non-compliant`. Cumulativeness of the ladder is checked when the schema
//! is loaded, not here.
//!
//! # Grades
//!
//! | Score | Grade |     | Score | Grade |
//! |-------|-------|-----|-------|-------|
//! | ≥0.95 | A+    |     | ≥0.65 | C+    |
//! | ≥0.90 | A     |     | ≥0.60 | C     |
//! | ≥0.85 | A-    |     | ≥0.55 | C-    |
//! | ≥0.80 | B+    |     | ≥0.50 | D+    |
//! | ≥0.75 | B     |     | ≥0.45 | D     |
//! | ≥0.70 | B-    |     | else  | F     |

use crate::models::{Category, CategoryScores, CheckResult, ComplianceLevel};
use crate::schema::{CategoryWeights, Evaluation, LevelSpec};
use tracing::debug;

/// Per-category pass fractions and the weighted overall score
pub fn aggregate(results: &[CheckResult], weights: &CategoryWeights) -> (f64, CategoryScores) {
    let mut scores = CategoryScores::default();
    for category in Category::ALL {
        let (passed, total) = results
            .iter()
            .filter(|r| r.category == category)
            .fold((0usize, 0usize), |(p, t), r| (p + r.passed as usize, t + 1));
        let fraction = if total == 0 {
            1.0
        } else {
            passed as f64 / total as f64
        };
        scores.set(category, fraction);
    }

    let score: f64 = Category::ALL
        .iter()
        .map(|c| weights.get(*c) * scores.get(*c))
        .sum();

    (score.clamp(0.0, 1.0), scores)
}

/// Highest ladder level whose requirements all hold
pub fn classify(
    results: &[CheckResult],
    score: f64,
    scores: CategoryScores,
    ladder: &[LevelSpec],
) -> ComplianceLevel {
    let eval = Evaluation::new(results, scores, score);

    for (index, level) in ladder.iter().enumerate().rev() {
        let unmet: Vec<&str> = level
            .requirements
            .iter()
            .filter(|(_, req)| !req.evaluate(&eval))
            .map(|(name, _)| name.as_str())
            .collect();
        if unmet.is_empty() {
            return ComplianceLevel::from_index(index).unwrap_or_default();
        }
        debug!("level {} unmet: {}", level.name, unmet.join(", "));
    }

    ComplianceLevel::NonCompliant
}

/// Letter grade for a score in [0, 1]
pub fn grade(score: f64) -> &'static str {
    const GRADES: [(f64, &str); 12] = [
        (0.95, "A+"),
        (0.90, "A"),
        (0.85, "A-"),
        (0.80, "B+"),
        (0.75, "B"),
        (0.70, "B-"),
        (0.65, "C+"),
        (0.60, "C"),
        (0.55, "C-"),
        (0.50, "D+"),
        (0.45, "D"),
        (0.0, "F"),
    ];
    GRADES
        .iter()
        .find(|(min, _)| score >= *min)
        .map(|(_, g)| *g)
        .unwrap_or("F")
}

/// Coarse status band for one category fraction
pub fn status(fraction: f64) -> &'static str {
    if fraction >= 0.9 {
        "excellent"
    } else if fraction >= 0.75 {
        "good"
    } else if fraction >= 0.5 {
        "fair"
    } else if fraction >= 0.25 {
        "poor"
    } else {
        "critical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{self, tests::GOOD_MANIFEST, tests::GOOD_README};
    use crate::models::CheckKind;
    use crate::schema::{Requirement, SchemaRegistry};
    use crate::snapshot::RepositorySnapshot;
    use std::collections::BTreeMap;

    fn result(category: Category, name: &str, passed: bool) -> CheckResult {
        CheckResult::new(
            category,
            name,
            passed,
            "",
            CheckKind::RequiredFile {
                path: name.to_string(),
            },
        )
    }

    #[test]
    fn test_builtin_weights_sum_to_one() {
        let registry = SchemaRegistry::builtin().unwrap();
        for name in registry.type_names() {
            let weights = &registry.load(name).unwrap().weights;
            assert!((weights.sum() - 1.0).abs() <= 1e-6, "{}", name);
        }
    }

    #[test]
    fn test_empty_category_counts_as_complete() {
        let results = vec![
            result(Category::Structural, "a", true),
            result(Category::Structural, "b", false),
        ];
        let (score, scores) = aggregate(&results, &CategoryWeights::default());
        assert_eq!(scores.structural, 0.5);
        assert_eq!(scores.content, 1.0);
        assert!((score - (0.3 * 0.5 + 0.3 + 0.2 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_classify_returns_highest_satisfied_level() {
        let mut ladder = Vec::new();
        let mut requirements = BTreeMap::new();
        for (i, name) in ["basic", "structured", "documented", "tested", "secure", "exemplary"]
            .iter()
            .enumerate()
        {
            requirements.insert(format!("r{}", i), Requirement::check(format!("c{}", i)));
            ladder.push(LevelSpec {
                name: name.to_string(),
                requirements: requirements.clone(),
            });
        }

        let results: Vec<CheckResult> = (0..6)
            .map(|i| result(Category::Content, &format!("c{}", i), i < 3))
            .collect();
        let (score, scores) = aggregate(&results, &CategoryWeights::default());
        assert_eq!(
            classify(&results, score, scores, &ladder),
            ComplianceLevel::Documented
        );

        let failing: Vec<CheckResult> = (0..6)
            .map(|i| result(Category::Content, &format!("c{}", i), false))
            .collect();
        assert_eq!(
            classify(&failing, 0.0, scores, &ladder),
            ComplianceLevel::NonCompliant
        );
    }

    #[test]
    fn test_domains_example() {
        let registry = SchemaRegistry::builtin().unwrap();
        let schema = registry.load("domains").unwrap();
        let snapshot = RepositorySnapshot::from_memory(
            ["models"],
            [("README.md", GOOD_README), ("fcm.manifest.json", GOOD_MANIFEST)],
        );
        let results = checks::evaluate(&snapshot, schema);
        let (score, scores) = aggregate(&results, &schema.weights);

        // 3 of 4 required paths plus 3 passing naming checks
        assert!((scores.structural - 6.0 / 7.0).abs() < 1e-9);
        assert_eq!(scores.content, 1.0);
        assert_eq!(scores.process, 0.0);
        let expected = 0.3 * scores.structural + 0.3 * 1.0 + 0.2 * scores.security;
        assert!((score - expected).abs() < 1e-9);

        let level = classify(&results, score, scores, &schema.ladder);
        assert_eq!(level, ComplianceLevel::Basic);
    }

    #[test]
    fn test_grades() {
        assert_eq!(grade(1.0), "A+");
        assert_eq!(grade(0.95), "A+");
        assert_eq!(grade(0.9499), "A");
        assert_eq!(grade(0.72), "B-");
        assert_eq!(grade(0.5), "D+");
        assert_eq!(grade(0.1), "F");
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(status(1.0), "excellent");
        assert_eq!(status(0.8), "good");
        assert_eq!(status(0.5), "fair");
        assert_eq!(status(0.3), "poor");
        assert_eq!(status(0.0), "critical");
    }
}
