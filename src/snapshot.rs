//! Read-only repository snapshot
//!
//! One walk of the repository captures the set of relative paths; file
//! contents are read lazily the first time a check asks for them and cached
//! in a shared map so the four check suites can read concurrently.

use crate::error::{Error, Result};
use dashmap::DashMap;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bounds applied while capturing a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLimits {
    /// Maximum directory depth walked below the root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of paths (files and directories) captured
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Files larger than this are never read
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Gitignore-style patterns skipped during the walk. `*` stays within one
    /// path segment, `**` spans any number, a leading `/` anchors at the root
    /// and a trailing `/` matches directories only.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            exclude: default_exclude(),
        }
    }
}

fn default_max_depth() -> usize {
    32
}
fn default_max_files() -> usize {
    20_000
}
fn default_max_file_bytes() -> u64 {
    1024 * 1024
}
fn default_exclude() -> Vec<String> {
    vec![
        "node_modules/".to_string(),
        "vendor/".to_string(),
        "target/".to_string(),
        ".venv/".to_string(),
    ]
}

/// Paths present in a repository at validation time
#[derive(Debug)]
pub struct RepositorySnapshot {
    root: Option<PathBuf>,
    dirs: BTreeSet<String>,
    files: BTreeSet<String>,
    unreadable: Vec<String>,
    truncated: bool,
    max_file_bytes: u64,
    contents: DashMap<String, Arc<String>>,
}

impl RepositorySnapshot {
    /// Walk `root` within `limits`. Fails only when `root` is not a directory;
    /// entries that cannot be walked are recorded and skipped.
    pub fn capture(root: &Path, limits: &SnapshotLimits) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::SnapshotRead {
                path: root.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false)
            .max_depth(Some(limits.max_depth))
            .overrides(exclusions(root, &limits.exclude))
            .filter_entry(|entry| entry.file_name() != ".git");

        let mut dirs = BTreeSet::new();
        let mut files = BTreeSet::new();
        let mut unreadable = Vec::new();
        let mut truncated = false;

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    unreadable.push(err.to_string());
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Some(rel) = relative(root, entry.path()) else {
                continue;
            };
            if dirs.len() + files.len() >= limits.max_files {
                truncated = true;
                break;
            }
            if entry.file_type().is_some_and(|t| t.is_dir()) {
                dirs.insert(rel);
            } else {
                files.insert(rel);
            }
        }

        if truncated {
            warn!(
                "Snapshot of {} truncated at {} paths",
                root.display(),
                limits.max_files
            );
        }
        debug!(
            "Captured {} dirs and {} files from {}",
            dirs.len(),
            files.len(),
            root.display()
        );

        Ok(Self {
            root: Some(root.to_path_buf()),
            dirs,
            files,
            unreadable,
            truncated,
            max_file_bytes: limits.max_file_bytes,
            contents: DashMap::new(),
        })
    }

    /// Build a snapshot without touching the filesystem. Parent directories
    /// of every file are added automatically.
    pub fn from_memory<D, F, P, C>(dirs: D, files: F) -> Self
    where
        D: IntoIterator<Item = P>,
        F: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let mut dir_set: BTreeSet<String> = BTreeSet::new();
        for dir in dirs {
            insert_with_parents(&mut dir_set, &dir.into());
        }

        let contents = DashMap::new();
        let mut file_set = BTreeSet::new();
        for (path, content) in files {
            let path: String = path.into();
            if let Some((parent, _)) = path.rsplit_once('/') {
                insert_with_parents(&mut dir_set, parent);
            }
            contents.insert(path.clone(), Arc::new(content.into()));
            file_set.insert(path);
        }

        Self {
            root: None,
            dirs: dir_set,
            files: file_set,
            unreadable: Vec::new(),
            truncated: false,
            max_file_bytes: default_max_file_bytes(),
            contents,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn has_dir(&self, rel: &str) -> bool {
        self.dirs.contains(rel.trim_end_matches('/'))
    }

    pub fn has_file(&self, rel: &str) -> bool {
        self.files.contains(rel)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.has_file(rel) || self.has_dir(rel)
    }

    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        self.dirs.iter().map(|s| s.as_str())
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|s| s.as_str())
    }

    /// Directories directly under the root
    pub fn top_level_dirs(&self) -> impl Iterator<Item = &str> {
        self.dirs().filter(|d| !d.contains('/'))
    }

    /// Files anywhere below `dir`
    pub fn files_under<'a>(&'a self, dir: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.files().filter(move |f| f.starts_with(&prefix))
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Walk errors recorded during capture
    pub fn unreadable(&self) -> &[String] {
        &self.unreadable
    }

    /// Read a captured file, caching the content for later checks
    pub fn read(&self, rel: &str) -> Result<Arc<String>> {
        if let Some(content) = self.contents.get(rel) {
            return Ok(Arc::clone(&content));
        }

        let Some(root) = &self.root else {
            return Err(read_error(rel, "not present in snapshot"));
        };
        if !self.files.contains(rel) {
            return Err(read_error(rel, "not present in snapshot"));
        }

        let path = root.join(rel);
        let metadata = std::fs::metadata(&path).map_err(|e| read_error(rel, e))?;
        if metadata.len() > self.max_file_bytes {
            return Err(read_error(
                rel,
                format!("larger than the {} byte read limit", self.max_file_bytes),
            ));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| read_error(rel, e))?;

        let content = Arc::new(content);
        self.contents.insert(rel.to_string(), Arc::clone(&content));
        Ok(content)
    }
}

fn read_error(rel: &str, reason: impl std::fmt::Display) -> Error {
    Error::SnapshotRead {
        path: rel.to_string(),
        reason: reason.to_string(),
    }
}

fn insert_with_parents(set: &mut BTreeSet<String>, dir: &str) {
    let dir = dir.trim_matches('/');
    let mut current = String::new();
    for part in dir.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        set.insert(current.clone());
    }
}

/// Relative path with `/` separators
fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Compile exclude patterns as ignore overrides. Invalid patterns are
/// logged and skipped so a bad config entry never aborts a run.
fn exclusions(root: &Path, patterns: &[String]) -> Override {
    let mut builder = OverrideBuilder::new(root);
    for pattern in patterns {
        // A bare override glob whitelists; `!` turns it into an ignore
        if let Err(err) = builder.add(&format!("!{}", pattern)) {
            warn!("Ignoring invalid exclude pattern '{}': {}", pattern, err);
        }
    }
    builder.build().unwrap_or_else(|err| {
        warn!("Exclude patterns unusable, walking everything: {}", err);
        Override::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_capture_sees_hidden_dirs_and_skips_git() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".github/workflows")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("models")).unwrap();
        fs::write(root.join(".github/workflows/ci.yml"), "on: push").unwrap();
        fs::write(root.join("models/fcm.example.md"), "# Example").unwrap();
        fs::write(root.join("README.md"), "# Readme").unwrap();

        let snapshot = RepositorySnapshot::capture(root, &SnapshotLimits::default()).unwrap();
        assert!(snapshot.has_dir(".github/workflows"));
        assert!(snapshot.has_file(".github/workflows/ci.yml"));
        assert!(snapshot.has_dir("models"));
        assert!(!snapshot.has_dir(".git"));
        assert!(!snapshot.dirs().any(|d| d.starts_with(".git/")));
        assert_eq!(snapshot.read("README.md").unwrap().as_str(), "# Readme");
    }

    #[test]
    fn test_capture_honours_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".remediation_backups")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join(".remediation_backups/README.md"), "old").unwrap();

        let mut limits = SnapshotLimits::default();
        limits.exclude.push("/.remediation_backups/".to_string());
        let snapshot = RepositorySnapshot::capture(root, &limits).unwrap();
        assert!(!snapshot.files().any(|f| f.contains("node_modules")));
        assert!(!snapshot.exists(".remediation_backups"));
        assert!(!snapshot.has_file(".remediation_backups/README.md"));
    }

    fn excluded(patterns: &[&str], rel: &str, is_dir: bool) -> bool {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        exclusions(Path::new("/repo"), &patterns)
            .matched(Path::new("/repo").join(rel), is_dir)
            .is_ignore()
    }

    #[test]
    fn test_exclude_patterns() {
        assert!(excluded(&["**/vendor/**"], "src/vendor/lib/foo.py", false));
        assert!(excluded(&["node_modules/"], "node_modules", true));
        assert!(excluded(&["node_modules/"], "web/node_modules", true));
        assert!(!excluded(&["node_modules/"], "node_modules", false));
        assert!(excluded(&["*.tmp"], "draft.tmp", false));

        // Anchored patterns only match at the root
        assert!(excluded(&["/vendor/"], "vendor", true));
        assert!(!excluded(&["/vendor/"], "src/vendor", true));

        // `*` does not cross a path separator
        assert!(excluded(&["src/*.tmp"], "src/a.tmp", false));
        assert!(!excluded(&["src/*.tmp"], "src/a/b/c.tmp", false));
        assert!(!excluded(&["/*.tmp"], "a/b/c.tmp", false));

        // Several wildcards in one pattern
        assert!(excluded(&["docs/**/drafts/*.md"], "docs/a/b/drafts/x.md", false));
        assert!(excluded(&["docs/**/drafts/*.md"], "docs/drafts/x.md", false));
        assert!(!excluded(&["docs/**/drafts/*.md"], "docs/a/drafts/sub/x.md", false));
        assert!(!excluded(&["docs/**/drafts/*.md"], "docs/a/drafts/x.txt", false));
        assert!(excluded(&["**/gen-*/**/*.json"], "a/gen-1/b/c.json", false));
        assert!(!excluded(&["**/gen-*/**/*.json"], "a/gen/b/c.json", false));

        assert!(!excluded(&[], "anything", false));
    }

    #[test]
    fn test_invalid_exclude_pattern_is_skipped() {
        assert!(excluded(&["a/{b", "*.tmp"], "draft.tmp", false));
    }

    #[test]
    fn test_capture_bounded_by_file_count() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
        }
        let limits = SnapshotLimits {
            max_files: 3,
            ..SnapshotLimits::default()
        };
        let snapshot = RepositorySnapshot::capture(dir.path(), &limits).unwrap();
        assert!(snapshot.is_truncated());
        assert_eq!(snapshot.files().count(), 3);
    }

    #[test]
    fn test_read_limit_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
        let limits = SnapshotLimits {
            max_file_bytes: 4,
            ..SnapshotLimits::default()
        };
        let snapshot = RepositorySnapshot::capture(dir.path(), &limits).unwrap();
        assert!(matches!(
            snapshot.read("big.txt"),
            Err(Error::SnapshotRead { .. })
        ));
        assert!(matches!(
            snapshot.read("absent.md"),
            Err(Error::SnapshotRead { .. })
        ));
    }

    #[test]
    fn test_capture_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(RepositorySnapshot::capture(&missing, &SnapshotLimits::default()).is_err());
    }

    #[test]
    fn test_from_memory_adds_parents() {
        let snapshot = RepositorySnapshot::from_memory(
            ["docs"],
            [("models/sub/fcm.a.md", "content")],
        );
        assert!(snapshot.has_dir("models"));
        assert!(snapshot.has_dir("models/sub"));
        assert!(snapshot.has_dir("docs"));
        assert_eq!(snapshot.top_level_dirs().collect::<Vec<_>>(), vec!["docs", "models"]);
        assert_eq!(snapshot.files_under("models").count(), 1);
        assert_eq!(snapshot.read("models/sub/fcm.a.md").unwrap().as_str(), "content");
    }
}
