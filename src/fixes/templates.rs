//! File templates used when remediation creates missing files

use chrono::{Datelike, Utc};

/// Values substituted into `{placeholder}`s
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    pub repository_name: String,
    pub repository_type: String,
    pub year: String,
    pub date: String,
}

impl TemplateContext {
    pub fn new(repository_name: impl Into<String>, repository_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            repository_name: repository_name.into(),
            repository_type: repository_type.into(),
            year: now.year().to_string(),
            date: now.format("%Y-%m-%d").to_string(),
        }
    }

    /// Replace known placeholders. Other braces (JSON) are left alone.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{repository_name}", &self.repository_name)
            .replace("{repository_type}", &self.repository_type)
            .replace("{year}", &self.year)
            .replace("{date}", &self.date)
    }

    /// Like `render`, for templates whose placeholders sit inside JSON strings
    pub fn render_json(&self, template: &str) -> String {
        Self {
            repository_name: json_escape(&self.repository_name),
            repository_type: json_escape(&self.repository_type),
            year: json_escape(&self.year),
            date: json_escape(&self.date),
        }
        .render(template)
    }
}

/// String contents as they appear between JSON quotes
fn json_escape(s: &str) -> String {
    let quoted = serde_json::Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

pub const README: &str = "# {repository_name}

## Overview

Brief description of this {repository_type} repository and the models it holds.

## Usage

Instructions for using the models and systems in this repository.

## Contributing

Guidelines for contributing to this repository.
";

pub const LICENSE: &str = r#"MIT License

Copyright (c) {year} {repository_name} contributors

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
"#;

pub const MANIFEST: &str = r#"{
  "type": "fcm-repository",
  "category": "{repository_type}",
  "name": "{repository_name}",
  "description": "FCM repository for {repository_type} models",
  "version": "1.0.0",
  "created": "{date}",
  "updated": "{date}",
  "license": "MIT",
  "keywords": ["fcm", "{repository_type}"],
  "maturity": "beta",
  "quality": {
    "fcm-compliance": false,
    "has-tests": false,
    "documentation-complete": false
  }
}
"#;

pub const SECURITY: &str = "# Security Policy

## Supported Versions

| Version | Supported          |
| ------- | ------------------ |
| 1.x.x   | :white_check_mark: |

## Reporting a Vulnerability

If you discover a security vulnerability in this repository:

1. **Do not** open a public issue
2. Contact the maintainers listed in the manifest directly
3. Include details about the vulnerability and steps to reproduce

We aim to respond within 48 hours.
";

pub const DEPENDABOT: &str = r#"version: 2
updates:
  - package-ecosystem: "github-actions"
    directory: "/"
    schedule:
      interval: "weekly"
"#;

pub const VALIDATE_WORKFLOW: &str = r#"name: Repository health

on:
  push:
    branches: [main]
  pull_request:

jobs:
  validate:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Validate repository
        run: repohealth validate . --json --min-score 0.7
"#;

pub const PRE_COMMIT: &str = r#"repos:
  - repo: local
    hooks:
      - id: repohealth
        name: repohealth validate
        entry: repohealth validate . --min-score 0.7
        language: system
        pass_filenames: false
"#;

/// Template for a repository-relative path, if one is known
pub fn for_path(path: &str, manifest_path: &str) -> Option<&'static str> {
    if path == manifest_path {
        return Some(MANIFEST);
    }
    match path {
        "README.md" => Some(README),
        "LICENSE" | "LICENSE.md" => Some(LICENSE),
        "SECURITY.md" | ".github/SECURITY.md" | "docs/SECURITY.md" => Some(SECURITY),
        ".github/dependabot.yml" | ".github/dependabot.yaml" => Some(DEPENDABOT),
        ".pre-commit-config.yaml" => Some(PRE_COMMIT),
        p if p.starts_with(".github/workflows/") => Some(VALIDATE_WORKFLOW),
        _ => None,
    }
}

/// Content for a required file with no template
pub fn placeholder(path: &str) -> String {
    format!("# {}\n\nGenerated file, please customize.\n", path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            repository_name: "atlas".into(),
            repository_type: "domains".into(),
            year: "2026".into(),
            date: "2026-01-02".into(),
        }
    }

    #[test]
    fn test_render_manifest_is_valid_json() {
        let rendered = ctx().render_json(MANIFEST);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["category"], "domains");
        assert_eq!(value["name"], "atlas");
        assert_eq!(value["created"], "2026-01-02");
    }

    #[test]
    fn test_manifest_escapes_repository_name() {
        let ctx = TemplateContext {
            repository_name: r#"we"ird\name"#.into(),
            ..ctx()
        };
        let rendered = ctx.render_json(MANIFEST);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["name"], r#"we"ird\name"#);

        // Plain-text templates keep the name verbatim
        assert!(ctx.render(README).starts_with(r#"# we"ird\name"#));
    }

    #[test]
    fn test_license_year() {
        assert!(ctx().render(LICENSE).contains("Copyright (c) 2026 atlas contributors"));
    }

    #[test]
    fn test_for_path() {
        assert_eq!(for_path("fcm.manifest.json", "fcm.manifest.json"), Some(MANIFEST));
        assert_eq!(for_path(".github/workflows/validate.yml", "x"), Some(VALIDATE_WORKFLOW));
        assert_eq!(for_path("CHANGELOG.md", "fcm.manifest.json"), None);
    }
}
