//! Output reporters for validation, remediation and health reports
//!
//! Supports multiple output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON (the CI contract for validation)
//! - `markdown` - GitHub-flavored Markdown
//! - `html` - Standalone HTML page (health dashboards and repository reports)

mod html;
mod json;
mod markdown;
mod text;

use crate::fixes::RemediationReport;
use crate::health::{Dashboard, RepositoryReport};
use crate::models::ValidationResult;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
    Html,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" | "htm" => Ok(OutputFormat::Html),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, markdown, html",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

/// Render a validation result. `repo_name` titles the text and markdown
/// output; JSON is exactly the `ValidationResult` shape.
pub fn validation(result: &ValidationResult, repo_name: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::validation(result, repo_name)),
        OutputFormat::Json => json::render(result),
        OutputFormat::Markdown => Ok(markdown::validation(result, repo_name)),
        OutputFormat::Html => Err(anyhow!(
            "HTML output is only available for health dashboards and repository reports"
        )),
    }
}

pub fn remediation(report: &RemediationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::render(report),
        // Remediation has no markdown rendering; the terminal form reads fine
        OutputFormat::Text | OutputFormat::Markdown => Ok(text::remediation(report)),
        OutputFormat::Html => Err(anyhow!(
            "HTML output is only available for health dashboards and repository reports"
        )),
    }
}

pub fn dashboard(dashboard: &Dashboard, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::render(dashboard),
        OutputFormat::Text => Ok(text::dashboard(dashboard)),
        OutputFormat::Markdown => Ok(markdown::dashboard(dashboard)),
        OutputFormat::Html => Ok(html::dashboard(dashboard)),
    }
}

pub fn repository(report: &RepositoryReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::render(report),
        OutputFormat::Text => Ok(text::repository(report)),
        OutputFormat::Markdown => Ok(markdown::repository(report)),
        OutputFormat::Html => Ok(html::repository(report)),
    }
}
