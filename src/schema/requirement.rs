//! Tagged requirement expressions used by compliance ladders
//!
//! A ladder level holds a set of named requirements. Each requirement is a
//! small predicate over the check results of one run:
//!
//! ```json
//! { "kind": "all", "of": [
//!     { "kind": "check", "name": "manifest:fields" },
//!     { "kind": "check", "name": "manifest:compliance" }
//! ] }
//! ```

use crate::models::{Category, CategoryScores, CheckResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A predicate a ladder level must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// A named check passed
    Check { name: String },
    /// Every check in the category passed
    CategoryComplete { category: Category },
    /// Category pass fraction is at least `min`
    CategoryAtLeast { category: Category, min: f64 },
    /// Overall score is at least `min`
    ScoreAtLeast { min: f64 },
    /// No check failed
    AllChecksPassed,
    All { of: Vec<Requirement> },
    Any { of: Vec<Requirement> },
    Not { requirement: Box<Requirement> },
}

/// Facts a requirement is evaluated against
pub struct Evaluation<'a> {
    passed: HashMap<&'a str, bool>,
    category_complete: HashMap<Category, bool>,
    scores: CategoryScores,
    score: f64,
}

impl<'a> Evaluation<'a> {
    pub fn new(results: &'a [CheckResult], scores: CategoryScores, score: f64) -> Self {
        let mut passed = HashMap::with_capacity(results.len());
        let mut category_complete: HashMap<Category, bool> =
            Category::ALL.iter().map(|c| (*c, true)).collect();

        for result in results {
            // Duplicate names only pass if every instance passed
            let entry = passed.entry(result.name.as_str()).or_insert(true);
            *entry &= result.passed;
            if !result.passed {
                category_complete.insert(result.category, false);
            }
        }

        Self {
            passed,
            category_complete,
            scores,
            score,
        }
    }
}

impl Requirement {
    pub fn check(name: impl Into<String>) -> Self {
        Requirement::Check { name: name.into() }
    }

    /// Evaluate against one run. A check that was never produced counts as failed.
    pub fn evaluate(&self, eval: &Evaluation<'_>) -> bool {
        match self {
            Requirement::Check { name } => {
                eval.passed.get(name.as_str()).copied().unwrap_or(false)
            }
            Requirement::CategoryComplete { category } => eval
                .category_complete
                .get(category)
                .copied()
                .unwrap_or(true),
            Requirement::CategoryAtLeast { category, min } => {
                eval.scores.get(*category) + f64::EPSILON >= *min
            }
            Requirement::ScoreAtLeast { min } => eval.score + f64::EPSILON >= *min,
            Requirement::AllChecksPassed => eval.passed.values().all(|p| *p),
            Requirement::All { of } => of.iter().all(|r| r.evaluate(eval)),
            Requirement::Any { of } => of.iter().any(|r| r.evaluate(eval)),
            Requirement::Not { requirement } => !requirement.evaluate(eval),
        }
    }

    /// Collect every check name this expression refers to
    pub fn referenced_checks<'r>(&'r self, out: &mut Vec<&'r str>) {
        match self {
            Requirement::Check { name } => out.push(name.as_str()),
            Requirement::All { of } | Requirement::Any { of } => {
                for r in of {
                    r.referenced_checks(out);
                }
            }
            Requirement::Not { requirement } => requirement.referenced_checks(out),
            Requirement::CategoryComplete { .. }
            | Requirement::CategoryAtLeast { .. }
            | Requirement::ScoreAtLeast { .. }
            | Requirement::AllChecksPassed => {}
        }
    }

    /// Short human-readable rendering, used in schema errors and reports
    pub fn describe(&self) -> String {
        match self {
            Requirement::Check { name } => name.clone(),
            Requirement::CategoryComplete { category } => format!("all {} checks", category),
            Requirement::CategoryAtLeast { category, min } => {
                format!("{} >= {:.2}", category, min)
            }
            Requirement::ScoreAtLeast { min } => format!("score >= {:.2}", min),
            Requirement::AllChecksPassed => "all checks".to_string(),
            Requirement::All { of } => join(of, " and "),
            Requirement::Any { of } => join(of, " or "),
            Requirement::Not { requirement } => format!("not {}", requirement.describe()),
        }
    }
}

fn join(of: &[Requirement], sep: &str) -> String {
    let parts: Vec<String> = of.iter().map(|r| r.describe()).collect();
    format!("({})", parts.join(sep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckKind;

    fn result(category: Category, name: &str, passed: bool) -> CheckResult {
        CheckResult::new(category, name, passed, "", CheckKind::CiWorkflows)
    }

    #[test]
    fn test_parse_tagged_expression() {
        let json = r#"{ "kind": "all", "of": [
            { "kind": "check", "name": "manifest:fields" },
            { "kind": "not", "requirement": { "kind": "score_at_least", "min": 0.9 } }
        ] }"#;
        let req: Requirement = serde_json::from_str(json).unwrap();
        let mut names = Vec::new();
        req.referenced_checks(&mut names);
        assert_eq!(names, vec!["manifest:fields"]);
    }

    #[test]
    fn test_missing_check_counts_as_failed() {
        let results = vec![result(Category::Content, "readme:length", true)];
        let eval = Evaluation::new(&results, CategoryScores::default(), 0.0);
        assert!(Requirement::check("readme:length").evaluate(&eval));
        assert!(!Requirement::check("manifest:fields").evaluate(&eval));
    }

    #[test]
    fn test_category_predicates() {
        let results = vec![
            result(Category::Structural, "a", true),
            result(Category::Security, "b", false),
        ];
        let scores = CategoryScores {
            structural: 1.0,
            content: 1.0,
            process: 1.0,
            security: 0.0,
        };
        let eval = Evaluation::new(&results, scores, 0.8);
        assert!(Requirement::CategoryComplete {
            category: Category::Structural
        }
        .evaluate(&eval));
        assert!(!Requirement::CategoryComplete {
            category: Category::Security
        }
        .evaluate(&eval));
        // No checks in the category means nothing failed
        assert!(Requirement::CategoryComplete {
            category: Category::Process
        }
        .evaluate(&eval));
        assert!(!Requirement::AllChecksPassed.evaluate(&eval));
        assert!(Requirement::ScoreAtLeast { min: 0.8 }.evaluate(&eval));
        assert!(Requirement::Any {
            of: vec![Requirement::check("b"), Requirement::check("a")]
        }
        .evaluate(&eval));
    }
}
