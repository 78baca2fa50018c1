//! Structural checks: required paths and naming conventions

use super::{file_name, preview, CheckSuite};
use crate::models::{Category, CheckKind, CheckResult};
use crate::schema::{check_names, RepositoryTypeSchema};
use crate::snapshot::RepositorySnapshot;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static MODEL_ID_LINE: OnceLock<Regex> = OnceLock::new();

/// Matches `**Model ID**: x` and `model_id: x` declarations
fn model_id_line() -> &'static Regex {
    MODEL_ID_LINE.get_or_init(|| {
        Regex::new(r"(?m)(?:\*\*Model ID\*\*:|^\s*model_id:)\s*`?([^\s`]+)`?").unwrap()
    })
}

pub struct StructuralSuite;

impl CheckSuite for StructuralSuite {
    fn category(&self) -> Category {
        Category::Structural
    }

    fn run(
        &self,
        snapshot: &RepositorySnapshot,
        schema: &RepositoryTypeSchema,
    ) -> Vec<CheckResult> {
        let mut results = Vec::new();

        for dir in &schema.required_directories {
            results.push(required_directory(snapshot, dir));
        }
        for file in &schema.required_files {
            results.push(required_file(snapshot, file));
        }

        results.push(directory_case(snapshot, schema));
        results.push(file_case(snapshot, schema));
        results.push(model_ids(snapshot, schema));
        results
    }
}

fn required_directory(snapshot: &RepositorySnapshot, dir: &str) -> CheckResult {
    let kind = CheckKind::RequiredDirectory {
        path: dir.to_string(),
    };
    let name = check_names::required_dir(dir);
    if snapshot.has_dir(dir) {
        CheckResult::pass(Category::Structural, name, format!("{}/ present", dir), kind)
    } else if snapshot.has_file(dir) {
        CheckResult::fail(
            Category::Structural,
            name,
            format!("{} exists but is a file", dir),
            kind,
        )
    } else {
        CheckResult::fail(Category::Structural, name, format!("{}/ not found", dir), kind)
    }
}

fn required_file(snapshot: &RepositorySnapshot, file: &str) -> CheckResult {
    let kind = CheckKind::RequiredFile {
        path: file.to_string(),
    };
    let name = check_names::required_file(file);
    if snapshot.has_file(file) {
        CheckResult::pass(Category::Structural, name, format!("{} present", file), kind)
    } else if snapshot.has_dir(file) {
        CheckResult::fail(
            Category::Structural,
            name,
            format!("{} exists but is a directory", file),
            kind,
        )
    } else {
        CheckResult::fail(Category::Structural, name, format!("{} not found", file), kind)
    }
}

/// Directories under hidden directories (`.github/ISSUE_TEMPLATE`) follow
/// their tool's conventions and are not checked.
fn is_hidden(path: &str) -> bool {
    path.split('/').any(|seg| seg.starts_with('.'))
}

fn directory_case(snapshot: &RepositorySnapshot, schema: &RepositoryTypeSchema) -> CheckResult {
    let pattern = &schema.naming.directory_pattern;
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => return invalid_pattern(check_names::DIRECTORY_CASE, pattern, e),
    };

    let offenders: Vec<String> = snapshot
        .dirs()
        .filter(|d| !is_hidden(d))
        .filter(|d| !re.is_match(file_name(d)))
        .map(String::from)
        .collect();

    let detail = if offenders.is_empty() {
        "all directory names follow the convention".to_string()
    } else {
        format!(
            "{} director{} not matching {}: {}",
            offenders.len(),
            if offenders.len() == 1 { "y" } else { "ies" },
            pattern,
            preview(&offenders)
        )
    };
    CheckResult::new(
        Category::Structural,
        check_names::DIRECTORY_CASE,
        offenders.is_empty(),
        detail,
        CheckKind::DirectoryCase { offenders },
    )
}

/// File names inside the required directories must follow the file pattern
fn file_case(snapshot: &RepositorySnapshot, schema: &RepositoryTypeSchema) -> CheckResult {
    let pattern = &schema.naming.file_pattern;
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => return invalid_pattern(check_names::FILE_CASE, pattern, e),
    };

    let mut offenders = BTreeSet::new();
    for dir in &schema.required_directories {
        for file in snapshot.files_under(dir) {
            let name = file_name(file);
            if name.starts_with('.') || is_hidden(file) {
                continue;
            }
            if schema.naming.file_exemptions.iter().any(|e| e == name) {
                continue;
            }
            if !re.is_match(name) {
                offenders.insert(file.to_string());
            }
        }
    }
    let offenders: Vec<String> = offenders.into_iter().collect();

    let detail = if offenders.is_empty() {
        "all file names follow the convention".to_string()
    } else {
        format!(
            "{} file(s) not matching {}: {}",
            offenders.len(),
            pattern,
            preview(&offenders)
        )
    };
    CheckResult::new(
        Category::Structural,
        check_names::FILE_CASE,
        offenders.is_empty(),
        detail,
        CheckKind::FileCase { offenders },
    )
}

/// Model ids declared inside model documents must match the id pattern
fn model_ids(snapshot: &RepositorySnapshot, schema: &RepositoryTypeSchema) -> CheckResult {
    let pattern = &schema.naming.model_id_pattern;
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => return invalid_pattern(check_names::MODEL_ID, pattern, e),
    };

    let mut checked = 0usize;
    let mut offenders = Vec::new();
    for file in snapshot
        .files()
        .filter(|f| schema.content.models.is_model_file(file_name(f)))
    {
        match snapshot.read(file) {
            Ok(content) => {
                for caps in model_id_line().captures_iter(&content) {
                    checked += 1;
                    let id = &caps[1];
                    if !re.is_match(id) {
                        offenders.push(format!("{}: {}", file, id));
                    }
                }
            }
            Err(e) => offenders.push(format!("{}: unreadable ({})", file, e)),
        }
    }

    let detail = if offenders.is_empty() {
        format!("{} model id(s) match {}", checked, pattern)
    } else {
        format!(
            "{} model id(s) not matching {}: {}",
            offenders.len(),
            pattern,
            preview(&offenders)
        )
    };
    CheckResult::new(
        Category::Structural,
        check_names::MODEL_ID,
        offenders.is_empty(),
        detail,
        CheckKind::ModelIdFormat { offenders },
    )
}

fn invalid_pattern(name: &str, pattern: &str, err: regex::Error) -> CheckResult {
    let kind = match name {
        check_names::DIRECTORY_CASE => CheckKind::DirectoryCase { offenders: vec![] },
        check_names::FILE_CASE => CheckKind::FileCase { offenders: vec![] },
        _ => CheckKind::ModelIdFormat { offenders: vec![] },
    };
    CheckResult::fail(
        Category::Structural,
        name,
        format!("invalid pattern {}: {}", pattern, err),
        kind,
    )
}
