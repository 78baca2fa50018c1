//! Text (terminal) reporter with colors and formatting
//!
//! Colors come from `console`, which drops them when stdout is not a TTY.

use crate::fixes::{ActionStatus, RemediationReport, SafetyTier};
use crate::health::{Dashboard, RepositoryReport, CRITICAL_THRESHOLD, HEALTHY_THRESHOLD};
use crate::models::{Category, Trend, ValidationResult, ViolationTier};
use crate::scoring;
use console::style;

const RULE: &str = "──────────────────────────────────────";

fn score_style(score: f64) -> console::StyledObject<String> {
    let text = format!("{:.2}", score);
    if score >= HEALTHY_THRESHOLD {
        style(text).green()
    } else if score >= CRITICAL_THRESHOLD {
        style(text).yellow()
    } else {
        style(text).red()
    }
}

fn tier_tag(tier: ViolationTier) -> console::StyledObject<&'static str> {
    match tier {
        ViolationTier::MissingPath => style("[P]").red(),
        ViolationTier::Naming => style("[N]").yellow(),
        ViolationTier::Content => style("[C]").yellow(),
        ViolationTier::Advisory => style("[A]").blue(),
    }
}

/// Score, grade, level, category bars, then violations with remedies
pub fn validation(result: &ValidationResult, repo_name: &str) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{} {}\n",
        style("Repository health:").bold(),
        style(repo_name).bold()
    ));
    out.push_str(&format!("{}\n", style(RULE).dim()));
    out.push_str(&format!(
        "Score: {}  Grade: {}  Level: {}  Type: {}\n\n",
        score_style(result.score).bold(),
        style(&result.health_metrics.overall_health).bold(),
        style(result.compliance_level).cyan(),
        result.repository_type
    ));

    out.push_str(&format!("{}\n", style("CATEGORIES").bold()));
    let scores = result.health_metrics.scores();
    for category in Category::ALL {
        let fraction = scores.get(category);
        out.push_str(&format!(
            "  {:<11} {}  {}\n",
            category.as_str(),
            score_style(fraction),
            style(scoring::status(fraction)).dim()
        ));
    }
    out.push('\n');

    if result.violations.is_empty() {
        out.push_str(&format!("{}\n", style("No violations.").green()));
        return out;
    }

    out.push_str(&format!(
        "{} ({} total)\n",
        style("VIOLATIONS").bold(),
        result.violations.len()
    ));
    if result.findings.is_empty() {
        // Deserialized results carry only the message lists
        for (message, remedy) in result.violations.iter().zip(&result.recommendations) {
            out.push_str(&format!("  - {}\n    {} {}\n", message, style("→").dim(), remedy));
        }
    } else {
        for finding in &result.findings {
            out.push_str(&format!(
                "  {} {}  {}\n    {} {}\n",
                tier_tag(finding.tier),
                finding.message,
                style(&finding.check).dim(),
                style("→").dim(),
                finding.recommendation
            ));
        }
    }
    out.push('\n');
    out
}

fn status_style(status: ActionStatus) -> console::StyledObject<&'static str> {
    match status {
        ActionStatus::Planned => style("planned").dim(),
        ActionStatus::Applied => style("applied").green(),
        ActionStatus::WouldApply => style("would apply").cyan(),
        ActionStatus::Skipped => style("skipped").dim(),
        ActionStatus::AlreadySatisfied => style("satisfied").dim(),
        ActionStatus::Failed => style("failed").red(),
    }
}

fn tier_style(tier: SafetyTier) -> console::StyledObject<&'static str> {
    match tier {
        SafetyTier::Safe => style("safe").green(),
        SafetyTier::Caution => style("caution").yellow(),
        SafetyTier::Risky => style("risky").red(),
    }
}

pub fn remediation(report: &RemediationReport) -> String {
    let mut out = String::new();
    let heading = if report.dry_run {
        "Remediation plan (dry run)"
    } else {
        "Remediation"
    };
    out.push_str(&format!("\n{}\n", style(heading).bold()));
    out.push_str(&format!("{}\n", style(RULE).dim()));

    let summary = &report.summary;
    out.push_str(&format!(
        "{} action(s): {} safe, {} caution, {} risky  (ceiling: {})\n\n",
        summary.total, summary.safe, summary.caution, summary.risky, report.max_safety
    ));

    if report.actions.is_empty() {
        out.push_str(&format!("{}\n", style("Nothing to fix.").green()));
        return out;
    }

    for action in &report.actions {
        out.push_str(&format!(
            "  {:<11} {:<8} {}\n",
            status_style(action.status),
            tier_style(action.tier),
            action.description
        ));
        if let Some(backup) = &action.backup {
            out.push_str(&format!("              {} {}\n", style("backup:").dim(), backup));
        }
        if let Some(error) = &action.error {
            out.push_str(&format!("              {} {}\n", style("error:").red(), error));
        }
    }
    out.push('\n');

    for warning in &summary.warnings {
        out.push_str(&format!("{} {}\n", style("!").yellow().bold(), warning));
    }

    let skipped = report.count(ActionStatus::Skipped);
    if skipped > 0 {
        out.push_str(&format!(
            "{}\n",
            style(format!(
                "{} action(s) above the '{}' ceiling were skipped; use --safety-level to include them",
                skipped, report.max_safety
            ))
            .dim()
        ));
    }
    out.push_str(&format!(
        "{} change(s), {} failure(s)\n",
        report.changes(),
        report.failed()
    ));
    out
}

fn trend_marker(trend: Trend) -> console::StyledObject<&'static str> {
    match trend {
        Trend::Improving => style("↑").green(),
        Trend::Stable => style("→").dim(),
        Trend::Declining => style("↓").red(),
        Trend::InsufficientData => style("·").dim(),
    }
}

/// Compact terminal dashboard, worst first
pub fn dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    let summary = &dashboard.summary;
    out.push_str(&format!("\n{}\n", style("Organisation health").bold()));
    out.push_str(&format!("{}\n", style(RULE).dim()));
    out.push_str(&format!(
        "Repositories: {}  Average: {}  Healthy: {}  Critical: {}\n\n",
        summary.total,
        score_style(summary.average_score),
        summary.healthy,
        summary.critical
    ));

    for entry in &dashboard.repositories {
        out.push_str(&format!(
            "  {} {:<30} {}  {:<2}  {:<13} {} issue(s)\n",
            trend_marker(entry.trend),
            entry.repo_id,
            score_style(entry.score),
            entry.grade,
            entry.compliance_level.as_str(),
            entry.violations
        ));
    }
    if !dashboard.recommendations.is_empty() {
        out.push('\n');
        for rec in &dashboard.recommendations {
            out.push_str(&format!("{} {}\n", style("•").cyan(), rec));
        }
    }
    out
}

/// Rows in the repository history listing
const HISTORY_ROWS: usize = 10;

pub fn repository(report: &RepositoryReport) -> String {
    let result = &report.latest.result;
    let mut out = String::new();
    out.push_str(&format!("\n{} {}\n", style("Repository").bold(), style(&report.repo_id).cyan().bold()));
    out.push_str(&format!("{}\n", style(RULE).dim()));
    out.push_str(&format!(
        "Score: {} ({})  Level: {}  Trend: {} {}\n",
        score_style(result.score),
        result.health_metrics.overall_health,
        result.compliance_level,
        trend_marker(report.trend),
        report.trend
    ));
    out.push_str(&format!(
        "Last updated: {}\n\n",
        report.latest.timestamp.format("%Y-%m-%d %H:%M")
    ));

    let scores = result.health_metrics.scores();
    for category in Category::ALL {
        out.push_str(&format!(
            "  {:<11} {}\n",
            category.as_str(),
            score_style(scores.get(category))
        ));
    }

    if !result.violations.is_empty() {
        out.push_str(&format!("\n{}\n", style("Open violations").bold()));
        for (message, remedy) in result.violations.iter().zip(&result.recommendations) {
            out.push_str(&format!("  {} {}\n", style("✗").red(), message));
            out.push_str(&format!("    {} {}\n", style("→").dim(), remedy));
        }
    }

    out.push_str(&format!(
        "\n{} (last {} days)\n",
        style("History").bold(),
        report.window_days
    ));
    if report.history.is_empty() {
        out.push_str("  No records in this window.\n");
    }
    let skip = report.history.len().saturating_sub(HISTORY_ROWS);
    for record in report.history.iter().skip(skip) {
        out.push_str(&format!(
            "  {}  {}  {:<2}  {} issue(s)\n",
            record.timestamp.format("%Y-%m-%d"),
            score_style(record.result.score),
            record.result.health_metrics.overall_health,
            record.result.violations.len()
        ));
    }
    out
}
