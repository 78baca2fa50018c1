//! Security checks: disclosure policy, dependency scanning, committed secrets

use super::process::any_present;
use super::{preview, CheckSuite};
use crate::models::{Category, CheckKind, CheckResult, SecretHit};
use crate::schema::{check_names, RepositoryTypeSchema};
use crate::snapshot::RepositorySnapshot;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Stop collecting hits after this many; one is enough to fail the check
const MAX_SECRET_HITS: usize = 20;

static SECRET_PATTERNS: OnceLock<Vec<SecretPattern>> = OnceLock::new();

struct SecretPattern {
    name: &'static str,
    pattern: Regex,
}

fn get_patterns() -> &'static Vec<SecretPattern> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            // AWS
            SecretPattern {
                name: "AWS Access Key ID",
                pattern: Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
            },
            SecretPattern {
                name: "AWS Secret Access Key",
                pattern: Regex::new(r"(?i)aws_secret_access_key\s*[=:]\s*[A-Za-z0-9/+=]{40}")
                    .unwrap(),
            },
            // GitHub
            SecretPattern {
                name: "GitHub Token",
                pattern: Regex::new(r"gh[pousr]_[a-zA-Z0-9]{36}").unwrap(),
            },
            SecretPattern {
                name: "Generic API Key",
                pattern: Regex::new(r#"(?i)api[_-]?key["']?\s*[=:]\s*["']?[a-zA-Z0-9_\-]{20,}"#)
                    .unwrap(),
            },
            SecretPattern {
                name: "Generic Secret",
                pattern: Regex::new(r#"(?i)(secret|password|passwd|pwd)["']?\s*[=:]\s*["']?[^\s"']{8,}"#)
                    .unwrap(),
            },
            SecretPattern {
                name: "Private Key",
                pattern: Regex::new(r"-----BEGIN (RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----")
                    .unwrap(),
            },
            SecretPattern {
                name: "Slack Token",
                pattern: Regex::new(r"xox[baprs]-[0-9]{10,13}-[0-9]{10,13}[a-zA-Z0-9-]*").unwrap(),
            },
            SecretPattern {
                name: "Stripe API Key",
                pattern: Regex::new(r"sk_live_[a-zA-Z0-9]{24,}").unwrap(),
            },
            SecretPattern {
                name: "Database URL with Password",
                pattern: Regex::new(r"(?i)(postgres|mysql|mongodb|redis)://[^:\s]+:[^@\s]+@")
                    .unwrap(),
            },
            SecretPattern {
                name: "SendGrid API Key",
                pattern: Regex::new(r"SG\.[a-zA-Z0-9_-]{22}\.[a-zA-Z0-9_-]{43}").unwrap(),
            },
        ]
    })
}

pub struct SecuritySuite;

impl CheckSuite for SecuritySuite {
    fn category(&self) -> Category {
        Category::Security
    }

    fn run(
        &self,
        snapshot: &RepositorySnapshot,
        schema: &RepositoryTypeSchema,
    ) -> Vec<CheckResult> {
        let rules = &schema.security;
        let mut results = vec![
            any_present(
                snapshot,
                Category::Security,
                check_names::SECURITY_POLICY,
                &rules.policy_files,
                CheckKind::SecurityPolicy,
            ),
            any_present(
                snapshot,
                Category::Security,
                check_names::DEPENDENCY_SCANNING,
                &rules.dependency_scanning_files,
                CheckKind::DependencyScanning,
            ),
        ];
        if rules.scan_secrets {
            results.push(secret_patterns(snapshot));
        }
        results
    }
}

fn secret_patterns(snapshot: &RepositorySnapshot) -> CheckResult {
    let mut hits = Vec::new();
    let mut scanned = 0usize;

    'files: for file in snapshot.files() {
        let content = match snapshot.read(file) {
            Ok(c) => c,
            Err(e) => {
                debug!("secret scan skipped {}: {}", file, e);
                continue;
            }
        };
        // Binary
        if content.contains('\0') {
            continue;
        }
        scanned += 1;

        for (line_num, line) in content.lines().enumerate() {
            for pattern in get_patterns() {
                let Some(m) = pattern.pattern.find(line) else {
                    continue;
                };
                if is_false_positive(m.as_str()) {
                    continue;
                }
                hits.push(SecretHit {
                    path: file.to_string(),
                    line: line_num + 1,
                    pattern: pattern.name.to_string(),
                });
                if hits.len() >= MAX_SECRET_HITS {
                    break 'files;
                }
            }
        }
    }

    let detail = if hits.is_empty() {
        format!("no credential patterns in {} file(s)", scanned)
    } else {
        let shown: Vec<String> = hits
            .iter()
            .map(|h| format!("{}:{} ({})", h.path, h.line, h.pattern))
            .collect();
        format!("{} possible secret(s): {}", hits.len(), preview(&shown))
    };
    CheckResult::new(
        Category::Security,
        check_names::SECRETS,
        hits.is_empty(),
        detail,
        CheckKind::SecretPatterns { hits },
    )
}

fn is_false_positive(matched: &str) -> bool {
    let lower = matched.to_lowercase();
    matched.len() < 10
        || lower.contains("example")
        || lower.contains("placeholder")
        || lower.contains("xxxx")
        || lower.contains("changeme")
        || lower.contains("${")
        || lower.contains("{{")
}
