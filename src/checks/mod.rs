//! Rule evaluator
//!
//! Four independent check suites (structural, content, process, security)
//! run against a read-only snapshot and schema. Suites share no mutable
//! state, so they run in parallel and are joined before aggregation.
//!
//! Every check is a pure function of `(snapshot, schema)`. A missing path or
//! an unreadable file produces a failed `CheckResult` with a descriptive
//! detail; evaluation never returns an error.

mod content;
mod process;
mod security;
mod structural;

pub(crate) use content::lookup;
pub use content::{missing_markers, readme_gaps, ContentSuite, ReadmeGaps};
pub use process::ProcessSuite;
pub use security::SecuritySuite;
pub use structural::StructuralSuite;

use crate::models::{Category, CheckResult};
use crate::schema::RepositoryTypeSchema;
use crate::snapshot::RepositorySnapshot;
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// A group of checks belonging to one category
///
/// # Example Implementation
///
/// ```ignore
/// pub struct LicenseSuite;
///
/// impl CheckSuite for LicenseSuite {
///     fn category(&self) -> Category {
///         Category::Content
///     }
///
///     fn run(&self, snapshot: &RepositorySnapshot, schema: &RepositoryTypeSchema) -> Vec<CheckResult> {
///         vec![CheckResult::new(
///             Category::Content,
///             "license:present",
///             snapshot.has_file("LICENSE"),
///             "LICENSE",
///             CheckKind::RequiredFile { path: "LICENSE".into() },
///         )]
///     }
/// }
/// ```
pub trait CheckSuite: Send + Sync {
    fn category(&self) -> Category;

    /// Run every check in the suite. Must not fail and must not mutate anything.
    fn run(&self, snapshot: &RepositorySnapshot, schema: &RepositoryTypeSchema)
        -> Vec<CheckResult>;
}

/// The default suites, in reporting order
pub fn default_suites() -> Vec<Box<dyn CheckSuite>> {
    vec![
        Box::new(StructuralSuite),
        Box::new(ContentSuite),
        Box::new(ProcessSuite),
        Box::new(SecuritySuite),
    ]
}

/// Run all suites against a snapshot. Result order is deterministic
/// (suite order, then check order within the suite).
pub fn evaluate(snapshot: &RepositorySnapshot, schema: &RepositoryTypeSchema) -> Vec<CheckResult> {
    run_suites(&default_suites(), snapshot, schema)
}

pub fn run_suites(
    suites: &[Box<dyn CheckSuite>],
    snapshot: &RepositorySnapshot,
    schema: &RepositoryTypeSchema,
) -> Vec<CheckResult> {
    let per_suite: Vec<Vec<CheckResult>> = suites
        .par_iter()
        .map(|suite| {
            let start = Instant::now();
            let results = suite.run(snapshot, schema);
            debug!(
                "{} checks: {}/{} passed in {:?}",
                suite.category(),
                results.iter().filter(|r| r.passed).count(),
                results.len(),
                start.elapsed()
            );
            results
        })
        .collect();

    per_suite.into_iter().flatten().collect()
}

/// Render a list for a check detail, capped so huge repositories stay readable
pub(crate) fn preview(items: &[String]) -> String {
    const MAX_SHOWN: usize = 5;
    if items.len() <= MAX_SHOWN {
        items.join(", ")
    } else {
        format!(
            "{} and {} more",
            items[..MAX_SHOWN].join(", "),
            items.len() - MAX_SHOWN
        )
    }
}

/// Final path segment
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
