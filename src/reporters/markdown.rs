//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Generates reports suitable for:
//! - Pull request comments
//! - Organisation dashboards committed to a wiki or docs repo

use crate::health::{Dashboard, RepositoryReport};
use crate::models::{Category, ComplianceLevel, Trend, ValidationResult};
use crate::scoring;
use chrono::Local;

/// Rows in the repository history table
const MAX_HISTORY_ROWS: usize = 10;

fn trend_emoji(trend: Trend) -> &'static str {
    match trend {
        Trend::Improving => "📈",
        Trend::Stable => "➡️",
        Trend::Declining => "📉",
        Trend::InsufficientData => "❔",
    }
}

fn status_emoji(status: &str) -> &'static str {
    match status {
        "excellent" => "🟢",
        "good" => "🟢",
        "fair" => "🟡",
        "poor" => "🟠",
        _ => "🔴",
    }
}

fn category_table(result: &ValidationResult) -> String {
    let mut md = String::from("| Category | Score | Status |\n|----------|-------|--------|\n");
    let scores = result.health_metrics.scores();
    for category in Category::ALL {
        let fraction = scores.get(category);
        let status = scoring::status(fraction);
        md.push_str(&format!(
            "| {} | {:.2} | {} {} |\n",
            category.as_str(),
            fraction,
            status_emoji(status),
            status
        ));
    }
    md
}

pub fn validation(result: &ValidationResult, repo_name: &str) -> String {
    let mut md = format!(
        "# Repository Health: {}\n\n**Score: {:.2}** | **Grade: {}** | **Level: {}** | Type: `{}`\n\n",
        repo_name,
        result.score,
        result.health_metrics.overall_health,
        result.compliance_level,
        result.repository_type
    );

    md.push_str("## Category Scores\n\n");
    md.push_str(&category_table(result));
    md.push('\n');

    md.push_str("## Violations\n\n");
    if result.violations.is_empty() {
        md.push_str("✅ No violations found.\n");
    } else {
        md.push_str("| Violation | Recommendation |\n|-----------|----------------|\n");
        for (message, remedy) in result.violations.iter().zip(&result.recommendations) {
            md.push_str(&format!("| {} | {} |\n", message, remedy));
        }
    }
    md.push('\n');
    md.push_str(&render_footer());
    md
}

pub fn dashboard(dashboard: &Dashboard) -> String {
    let summary = &dashboard.summary;
    let mut md = format!(
        "# Organisation Repository Health Dashboard\n\nGenerated: {} | Window: last {} days\n\n",
        dashboard.generated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        dashboard.window_days
    );

    md.push_str("## Summary\n\n| Metric | Value |\n|--------|-------|\n");
    md.push_str(&format!("| Total Repositories | {} |\n", summary.total));
    md.push_str(&format!("| Average Score | {:.2} |\n", summary.average_score));
    md.push_str(&format!("| Healthy (>0.7) | {} |\n", summary.healthy));
    md.push_str(&format!("| Critical (<0.4) | {} |\n\n", summary.critical));

    md.push_str("## Compliance Distribution\n\n| Level | Repositories | Share |\n|-------|--------------|-------|\n");
    let levels = std::iter::once(ComplianceLevel::NonCompliant).chain(ComplianceLevel::LADDER);
    for level in levels {
        let count = summary
            .level_distribution
            .get(level.as_str())
            .copied()
            .unwrap_or(0);
        if count == 0 {
            continue;
        }
        md.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            level,
            count,
            count as f64 / summary.total.max(1) as f64 * 100.0
        ));
    }
    md.push('\n');

    md.push_str("## Repositories\n\n");
    if dashboard.repositories.is_empty() {
        md.push_str("No health records yet. Run `repohealth health update` first.\n\n");
    } else {
        md.push_str("| Repository | Score | Grade | Level | Trend | Issues |\n");
        md.push_str("|------------|-------|-------|-------|-------|--------|\n");
        for entry in &dashboard.repositories {
            md.push_str(&format!(
                "| {} | {:.2} | {} | {} | {} {} | {} |\n",
                entry.repo_id,
                entry.score,
                entry.grade,
                entry.compliance_level,
                trend_emoji(entry.trend),
                entry.trend,
                entry.violations
            ));
        }
        md.push('\n');
    }

    let critical: Vec<_> = dashboard.critical().collect();
    if !critical.is_empty() {
        md.push_str("## Critical Issues\n\n");
        for entry in critical {
            md.push_str(&format!(
                "- **{}**: score {:.2}, {} issue(s)\n",
                entry.repo_id, entry.score, entry.violations
            ));
        }
        md.push('\n');
    }

    if !summary.trends.is_empty() {
        md.push_str("## Trends\n\n");
        for (trend, repos) in &summary.trends {
            md.push_str(&format!("- **{}**: {}\n", trend, repos.join(", ")));
        }
        md.push('\n');
    }

    if !dashboard.recommendations.is_empty() {
        md.push_str("## Recommendations\n\n");
        for rec in &dashboard.recommendations {
            md.push_str(&format!("- {}\n", rec));
        }
        md.push('\n');
    }

    md.push_str(&render_footer());
    md
}

pub fn repository(report: &RepositoryReport) -> String {
    let latest = &report.latest;
    let result = &latest.result;
    let mut md = format!(
        "# Repository Health Report: {}\n\nPeriod: last {} days\n\n",
        report.repo_id, report.window_days
    );

    md.push_str("## Current Status\n\n");
    md.push_str(&format!(
        "- **Score**: {:.2} ({})\n",
        result.score, result.health_metrics.overall_health
    ));
    md.push_str(&format!("- **Compliance level**: {}\n", result.compliance_level));
    md.push_str(&format!("- **Violations**: {}\n", result.violations.len()));
    md.push_str(&format!(
        "- **Trend**: {} {}\n",
        trend_emoji(report.trend),
        report.trend
    ));
    md.push_str(&format!(
        "- **Last updated**: {}\n\n",
        latest.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    ));

    md.push_str("## Category Scores\n\n");
    md.push_str(&category_table(result));
    md.push('\n');

    if !result.violations.is_empty() {
        md.push_str("## Open Violations\n\n");
        for (message, remedy) in result.violations.iter().zip(&result.recommendations) {
            md.push_str(&format!("- {} ({})\n", message, remedy));
        }
        md.push('\n');
    }

    md.push_str("## Historical Trend\n\n");
    if report.history.is_empty() {
        md.push_str("No records in this window.\n\n");
    } else {
        md.push_str("| Date | Score | Grade | Issues |\n|------|-------|-------|--------|\n");
        let skip = report.history.len().saturating_sub(MAX_HISTORY_ROWS);
        for record in report.history.iter().skip(skip) {
            md.push_str(&format!(
                "| {} | {:.2} | {} | {} |\n",
                record.timestamp.with_timezone(&Local).format("%Y-%m-%d"),
                record.result.score,
                record.result.health_metrics.overall_health,
                record.result.violations.len()
            ));
        }
        md.push('\n');
    }

    md.push_str(&render_footer());
    md
}

fn render_footer() -> String {
    format!(
        "---\n\n*Generated by repohealth v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}
