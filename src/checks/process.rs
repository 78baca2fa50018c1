//! Process checks: CI workflows, validation tooling, automation, pre-commit

use super::{file_name, CheckSuite};
use crate::models::{Category, CheckKind, CheckResult};
use crate::schema::{check_names, RepositoryTypeSchema};
use crate::snapshot::RepositorySnapshot;

pub struct ProcessSuite;

impl CheckSuite for ProcessSuite {
    fn category(&self) -> Category {
        Category::Process
    }

    fn run(
        &self,
        snapshot: &RepositorySnapshot,
        schema: &RepositoryTypeSchema,
    ) -> Vec<CheckResult> {
        let rules = &schema.process;
        vec![
            ci_workflows(snapshot, &rules.workflow_dir, &rules.workflow_extensions),
            any_present(
                snapshot,
                Category::Process,
                check_names::VALIDATION_TOOLS,
                &rules.validation_paths,
                CheckKind::ValidationTools,
            ),
            any_present(
                snapshot,
                Category::Process,
                check_names::AUTOMATION,
                &rules.automation_paths,
                CheckKind::AutomationScripts,
            ),
            any_present(
                snapshot,
                Category::Process,
                check_names::PRE_COMMIT,
                &rules.pre_commit_paths,
                CheckKind::PreCommit,
            ),
        ]
    }
}

fn ci_workflows(snapshot: &RepositorySnapshot, dir: &str, extensions: &[String]) -> CheckResult {
    let workflows: Vec<&str> = snapshot
        .files_under(dir)
        .filter(|f| {
            // Direct children only
            f[dir.trim_end_matches('/').len() + 1..].find('/').is_none()
        })
        .filter(|f| {
            file_name(f)
                .rsplit_once('.')
                .is_some_and(|(_, ext)| extensions.iter().any(|e| e == ext))
        })
        .collect();

    let detail = if workflows.is_empty() {
        format!("no workflow definitions in {}", dir)
    } else {
        format!("{} workflow(s): {}", workflows.len(), workflows.join(", "))
    };
    CheckResult::new(
        Category::Process,
        check_names::CI_WORKFLOWS,
        !workflows.is_empty(),
        detail,
        CheckKind::CiWorkflows,
    )
}

/// Passes when any candidate path exists, as a file or a directory
pub(super) fn any_present(
    snapshot: &RepositorySnapshot,
    category: Category,
    name: &str,
    candidates: &[String],
    kind: CheckKind,
) -> CheckResult {
    match candidates.iter().find(|c| snapshot.exists(c)) {
        Some(found) => CheckResult::pass(category, name, format!("found {}", found), kind),
        None => CheckResult::fail(
            category,
            name,
            format!("none of {} found", candidates.join(", ")),
            kind,
        ),
    }
}
