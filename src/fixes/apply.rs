//! Sequential, backed-up execution of remediation actions
//!
//! Every action runs as: check precondition → backup → mutate → verify.
//! A failure is recorded on that action only. Backups are never removed.

use super::{
    complete_readme_content, summarize, ActionStatus, FixOperation, PlanSummary,
    RemediationAction, SafetyTier,
};
use crate::checks::{missing_markers, readme_gaps};
use crate::error::{Error, Result};
use crate::schema::{MarkerRule, ReadmeRules};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOptions {
    pub max_safety: SafetyTier,
    pub dry_run: bool,
    /// Relative to the repository root
    pub backup_dir: String,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            max_safety: SafetyTier::Safe,
            dry_run: false,
            backup_dir: ".remediation_backups".to_string(),
        }
    }
}

/// Outcome of one remediation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationReport {
    pub dry_run: bool,
    pub max_safety: SafetyTier,
    pub summary: PlanSummary,
    pub actions: Vec<RemediationAction>,
}

impl RemediationReport {
    pub fn count(&self, status: ActionStatus) -> usize {
        self.actions.iter().filter(|a| a.status == status).count()
    }

    /// Actions that changed (or, in a dry run, would change) the repository
    pub fn changes(&self) -> usize {
        self.count(ActionStatus::Applied) + self.count(ActionStatus::WouldApply)
    }

    pub fn failed(&self) -> usize {
        self.count(ActionStatus::Failed)
    }
}

pub fn apply(
    actions: &[RemediationAction],
    root: &Path,
    options: &ApplyOptions,
) -> RemediationReport {
    let mut executed = Vec::with_capacity(actions.len());

    for action in actions {
        let mut action = action.clone();
        if action.tier > options.max_safety {
            debug!(
                "Skipping {} ({} above {})",
                action.description, action.tier, options.max_safety
            );
            action.status = ActionStatus::Skipped;
            executed.push(action);
            continue;
        }

        match run(&action, root, options) {
            Ok((status, backup)) => {
                debug!("{}: {:?}", action.description, status);
                action.status = status;
                action.backup = backup.map(|p| p.display().to_string());
            }
            Err((err, backup)) => {
                warn!("Remediation failed: {}", err);
                action.status = ActionStatus::Failed;
                action.backup = backup.map(|p| p.display().to_string());
                action.error = Some(err.to_string());
            }
        }
        executed.push(action);
    }

    let report = RemediationReport {
        dry_run: options.dry_run,
        max_safety: options.max_safety,
        summary: summarize(actions),
        actions: executed,
    };
    info!(
        "Remediation {}: {} change(s), {} failed",
        if options.dry_run { "dry run" } else { "run" },
        report.changes(),
        report.failed()
    );
    report
}

type Outcome = std::result::Result<(ActionStatus, Option<PathBuf>), (Error, Option<PathBuf>)>;

fn run(action: &RemediationAction, root: &Path, options: &ApplyOptions) -> Outcome {
    let op = &action.operation;
    let fail = |reason: String, backup: Option<PathBuf>| {
        (
            Error::RemediationAction {
                action: action.description.clone(),
                reason,
            },
            backup,
        )
    };

    match satisfied(op, root) {
        Ok(true) => return Ok((ActionStatus::AlreadySatisfied, None)),
        Ok(false) => {}
        Err(e) => return Err(fail(e.to_string(), None)),
    }
    if options.dry_run {
        return Ok((ActionStatus::WouldApply, None));
    }

    let backup = if op.modifies_existing() && root.join(op.target()).exists() {
        let saved = backup(root, &options.backup_dir, op.target())
            .map_err(|e| fail(format!("backup failed: {}", e), None))?;
        Some(saved)
    } else {
        None
    };

    mutate(op, root).map_err(|e| fail(e.to_string(), backup.clone()))?;

    match satisfied(op, root) {
        Ok(true) => Ok((ActionStatus::Applied, backup)),
        Ok(false) => Err(fail("verification failed after applying".into(), backup)),
        Err(e) => Err(fail(format!("verification failed: {}", e), backup)),
    }
}

/// Whether the operation's goal already holds on disk
fn satisfied(op: &FixOperation, root: &Path) -> Result<bool> {
    Ok(match op {
        FixOperation::CreateDirectory { path } => root.join(path).is_dir(),
        FixOperation::CreateFile { path, .. } => root.join(path).is_file(),
        FixOperation::CompleteReadme {
            path,
            sections,
            min_length,
            ..
        } => {
            let Some(content) = read_if_present(&root.join(path))? else {
                return Ok(false);
            };
            let rules = ReadmeRules {
                path: path.clone(),
                min_length: *min_length,
                sections: sections.clone(),
            };
            let gaps = readme_gaps(&content, &rules);
            gaps.has_heading && gaps.missing_sections.is_empty() && gaps.length >= *min_length
        }
        // A model file that is gone (renamed by a later action) has no gap left
        FixOperation::AddModelMarkers { path, markers, .. } => {
            match read_if_present(&root.join(path))? {
                Some(content) => missing_markers(&content, markers).is_empty(),
                None => true,
            }
        }
        FixOperation::SetJsonFields { path, fields } => {
            let Some(content) = read_if_present(&root.join(path))? else {
                return Ok(false);
            };
            let doc: Value = serde_json::from_str(&content)?;
            fields
                .iter()
                .all(|(key, value)| crate::checks::lookup(&doc, key) == Some(value))
        }
        FixOperation::Rename { from, to } => {
            !root.join(from).exists() && root.join(to).exists()
        }
    })
}

fn read_if_present(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn mutate(op: &FixOperation, root: &Path) -> Result<()> {
    match op {
        FixOperation::CreateDirectory { path } => fs::create_dir_all(root.join(path))?,
        FixOperation::CreateFile { path, content, .. } => {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)?;
            file.write_all(content.as_bytes())?;
        }
        FixOperation::CompleteReadme {
            path,
            title,
            sections,
            min_length,
        } => {
            let target = root.join(path);
            let content = fs::read_to_string(&target)?;
            fs::write(
                &target,
                complete_readme_content(&content, title, sections, *min_length),
            )?;
        }
        FixOperation::AddModelMarkers {
            path,
            model_id,
            markers,
        } => {
            let target = root.join(path);
            let content = fs::read_to_string(&target)?;
            fs::write(&target, add_markers(&content, model_id, markers))?;
        }
        FixOperation::SetJsonFields { path, fields } => {
            let target = root.join(path);
            let mut doc: Value = serde_json::from_str(&fs::read_to_string(&target)?)?;
            set_fields(&mut doc, fields).map_err(|reason| Error::RemediationAction {
                action: op.describe(),
                reason,
            })?;
            let mut out = serde_json::to_string_pretty(&doc)?;
            out.push('\n');
            fs::write(&target, out)?;
        }
        FixOperation::Rename { from, to } => {
            let dest = root.join(to);
            if dest.exists() {
                return Err(Error::RemediationAction {
                    action: op.describe(),
                    reason: format!("{} already exists", to),
                });
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(root.join(from), dest)?;
        }
    }
    Ok(())
}

/// Insert the first spelling of each missing marker. Id markers go right
/// after the title with the model id; the rest are appended.
fn add_markers(content: &str, model_id: &str, markers: &[MarkerRule]) -> String {
    let missing = missing_markers(content, markers);
    let mut header = Vec::new();
    let mut footer = Vec::new();
    for rule in markers.iter().filter(|r| missing.contains(&r.name)) {
        let Some(marker) = rule.any_of.first() else {
            continue;
        };
        if rule.name.to_lowercase().contains("id") {
            header.push(format!("{} {}", marker, model_id));
        } else {
            footer.push(marker.clone());
        }
    }

    let mut out = String::with_capacity(content.len() + 64);
    let mut rest = content;
    if content.starts_with('#') {
        let (title, tail) = content.split_once('\n').unwrap_or((content, ""));
        out.push_str(title);
        out.push('\n');
        rest = tail;
    }
    if !header.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&header.join("\n"));
        out.push('\n');
    }
    out.push_str(rest);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    for marker in footer {
        out.push_str(&format!("\n{}\n", marker));
    }
    out
}

/// Set dotted keys, creating intermediate objects
fn set_fields(doc: &mut Value, fields: &BTreeMap<String, Value>) -> std::result::Result<(), String> {
    for (key, value) in fields {
        let mut current = &mut *doc;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            let Value::Object(map) = current else {
                return Err(format!("cannot set {}: parent is not an object", key));
            };
            if parts.peek().is_none() {
                map.insert(part.to_string(), value.clone());
                break;
            }
            current = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
        }
    }
    Ok(())
}

/// Copy `rel` to `<root>/<backup_dir>/<rel>`, adding `.1`, `.2`, … when a
/// backup of that path already exists
fn backup(root: &Path, backup_dir: &str, rel: &str) -> Result<PathBuf> {
    let base = root.join(backup_dir);
    let mut dest = base.join(rel);
    let mut n = 1;
    while dest.exists() {
        dest = base.join(format!("{}.{}", rel, n));
        n += 1;
    }

    let source = root.join(rel);
    copy_recursive(&source, &dest)?;
    debug!("Backed up {} to {}", rel, dest.display());
    Ok(dest)
}

fn copy_recursive(source: &Path, dest: &Path) -> Result<()> {
    if source.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, dest)?;
    }
    Ok(())
}
