//! HTML reporter for health dashboards
//!
//! Generates a standalone page with embedded styles that can be opened in
//! any browser or published as a static artifact.

use crate::health::{Dashboard, DashboardEntry, RepositoryReport, CRITICAL_THRESHOLD};
use crate::models::{Category, ComplianceLevel, HealthRecord};
use crate::scoring;
use chrono::Local;

/// Rows in the repository history table
const MAX_HISTORY_ROWS: usize = 10;

/// Scores above this get the "good" row highlight
const GOOD_ROW_THRESHOLD: f64 = 0.8;

pub fn dashboard(dashboard: &Dashboard) -> String {
    let mut html = render_head("Organisation Repository Health Dashboard");
    html.push_str("<body>\n<div class=\"container\">\n");
    html.push_str(&render_header(
        "Organisation Repository Health Dashboard",
        &format!("Window: last {} days", dashboard.window_days),
    ));
    html.push_str("<div class=\"content\">\n");

    let summary = &dashboard.summary;
    html.push_str("<div class=\"section\">\n    <h2 class=\"section-title\">Summary</h2>\n");
    html.push_str("    <div class=\"metrics-grid\">\n");
    html.push_str(&metric_card("Total Repositories", &summary.total.to_string()));
    html.push_str(&metric_card(
        "Average Health Score",
        &format!("{:.2}", summary.average_score),
    ));
    html.push_str(&metric_card(
        "Healthy Repositories",
        &format!("{}/{}", summary.healthy, summary.total),
    ));
    html.push_str(&metric_card("Critical Issues", &summary.critical.to_string()));
    html.push_str("    </div>\n</div>\n");

    html.push_str(&render_distribution(dashboard));

    html.push_str("<div class=\"section\">\n    <h2 class=\"section-title\">Repository Status</h2>\n");
    if dashboard.repositories.is_empty() {
        html.push_str(
            "    <p class=\"empty\">No health records yet. Run <code>repohealth health update</code> first.</p>\n",
        );
    } else {
        html.push_str(
            "    <table>\n        <tr><th>Repository</th><th>Score</th><th>Grade</th><th>Compliance Level</th><th>Trend</th><th>Issues</th></tr>\n",
        );
        for entry in &dashboard.repositories {
            html.push_str(&render_entry(entry));
        }
        html.push_str("    </table>\n");
    }
    html.push_str("</div>\n");

    if !dashboard.recommendations.is_empty() {
        html.push_str(
            "<div class=\"section\">\n    <h2 class=\"section-title\">Recommendations</h2>\n    <ul>\n",
        );
        for rec in &dashboard.recommendations {
            html.push_str(&format!("        <li>{}</li>\n", html_escape(rec)));
        }
        html.push_str("    </ul>\n</div>\n");
    }

    html.push_str("</div>\n");
    html.push_str(&render_footer());
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

pub fn repository(report: &RepositoryReport) -> String {
    let result = &report.latest.result;
    let title = format!("Repository Health Report: {}", report.repo_id);
    let mut html = render_head(&title);
    html.push_str("<body>\n<div class=\"container\">\n");
    html.push_str(&render_header(
        &title,
        &format!("Period: last {} days", report.window_days),
    ));
    html.push_str("<div class=\"content\">\n");

    html.push_str("<div class=\"section\">\n    <h2 class=\"section-title\">Current Status</h2>\n");
    html.push_str("    <div class=\"metrics-grid\">\n");
    html.push_str(&metric_card(
        "Score",
        &format!(
            "{:.2} ({})",
            result.score,
            html_escape(&result.health_metrics.overall_health)
        ),
    ));
    html.push_str(&metric_card(
        "Compliance Level",
        result.compliance_level.as_str(),
    ));
    html.push_str(&metric_card("Violations", &result.violations.len().to_string()));
    html.push_str(&metric_card("Trend", &report.trend.to_string()));
    html.push_str("    </div>\n</div>\n");

    html.push_str("<div class=\"section\">\n    <h2 class=\"section-title\">Category Scores</h2>\n");
    html.push_str("    <div class=\"metrics-grid\">\n");
    let scores = result.health_metrics.scores();
    for category in Category::ALL {
        let fraction = scores.get(category);
        html.push_str(&format!(
            r#"        <div class="metric-card">
            <h3>{}</h3>
            <div class="metric-value">{:.2}</div>
            <div class="metric-bar"><div class="metric-bar-fill {}" style="width: {:.0}%"></div></div>
        </div>
"#,
            category.as_str(),
            fraction,
            bar_class(fraction),
            fraction * 100.0
        ));
    }
    html.push_str("    </div>\n</div>\n");

    if !result.violations.is_empty() {
        html.push_str(
            "<div class=\"section\">\n    <h2 class=\"section-title\">Open Violations</h2>\n    <ul>\n",
        );
        for (message, remedy) in result.violations.iter().zip(&result.recommendations) {
            html.push_str(&format!(
                "        <li>{} <span class=\"remedy\">{}</span></li>\n",
                html_escape(message),
                html_escape(remedy)
            ));
        }
        html.push_str("    </ul>\n</div>\n");
    }

    html.push_str("<div class=\"section\">\n    <h2 class=\"section-title\">Historical Trend</h2>\n");
    if report.history.is_empty() {
        html.push_str("    <p class=\"empty\">No records in this window.</p>\n");
    } else {
        html.push_str(
            "    <table>\n        <tr><th>Date</th><th>Score</th><th>Grade</th><th>Issues</th></tr>\n",
        );
        let skip = report.history.len().saturating_sub(MAX_HISTORY_ROWS);
        for record in report.history.iter().skip(skip) {
            html.push_str(&render_history_row(record));
        }
        html.push_str("    </table>\n");
    }
    html.push_str("</div>\n");

    html.push_str("</div>\n");
    html.push_str(&render_footer());
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_head(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>
{CSS}
    </style>
</head>
"#,
        html_escape(title)
    )
}

fn render_header(title: &str, subtitle: &str) -> String {
    format!(
        r#"<div class="header">
    <h1>{}</h1>
    <p class="timestamp">Generated {} | {}</p>
</div>
"#,
        html_escape(title),
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        html_escape(subtitle)
    )
}

fn metric_card(label: &str, value: &str) -> String {
    format!(
        "        <div class=\"metric-card\"><h3>{}</h3><div class=\"metric-value\">{}</div></div>\n",
        label, value
    )
}

fn render_distribution(dashboard: &Dashboard) -> String {
    let summary = &dashboard.summary;
    let mut html = String::from(
        "<div class=\"section\">\n    <h2 class=\"section-title\">Compliance Distribution</h2>\n    <table>\n        <tr><th>Level</th><th>Repositories</th><th>Share</th></tr>\n",
    );
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
        html.push_str(&format!(
            "        <tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            level,
            count,
            count as f64 / summary.total.max(1) as f64 * 100.0
        ));
    }
    html.push_str("    </table>\n</div>\n");
    html
}

fn render_entry(entry: &DashboardEntry) -> String {
    let row_class = if entry.score < CRITICAL_THRESHOLD {
        "critical"
    } else if entry.score > GOOD_ROW_THRESHOLD {
        "good"
    } else {
        ""
    };
    format!(
        "        <tr class=\"{}\"><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        row_class,
        html_escape(&entry.repo_id),
        entry.score,
        html_escape(&entry.grade),
        entry.compliance_level,
        entry.trend,
        entry.violations
    )
}

fn render_history_row(record: &HealthRecord) -> String {
    format!(
        "        <tr><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>\n",
        record.timestamp.with_timezone(&Local).format("%Y-%m-%d"),
        record.result.score,
        html_escape(&record.result.health_metrics.overall_health),
        record.result.violations.len()
    )
}

fn render_footer() -> String {
    format!(
        "<div class=\"footer\">\n    <p>Generated by repohealth v{}</p>\n</div>\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn bar_class(fraction: f64) -> &'static str {
    match scoring::status(fraction) {
        "excellent" | "good" => "bar-good",
        "fair" => "bar-moderate",
        _ => "bar-poor",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// Embedded CSS
const CSS: &str = r#"
:root {
    --primary-color: #0f766e;
    --background-color: #f8fafc;
    --text-color: #1e293b;
    --border-color: #e2e8f0;
}

* { margin: 0; padding: 0; box-sizing: border-box; }

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    line-height: 1.6;
    color: var(--text-color);
    background: var(--background-color);
    padding: 2rem;
}

.container {
    max-width: 1100px;
    margin: 0 auto;
    background: white;
    border-radius: 12px;
    box-shadow: 0 4px 6px -1px rgba(0,0,0,0.1);
    overflow: hidden;
}

.header {
    background: linear-gradient(135deg, #0f766e 0%, #0369a1 100%);
    color: white;
    padding: 2.5rem 2rem;
    text-align: center;
}

.header h1 { font-size: 2rem; margin-bottom: 0.5rem; }
.header .timestamp { opacity: 0.9; font-size: 0.95rem; }

.content { padding: 2rem; }

.section { margin-bottom: 2rem; }
.section-title {
    font-size: 1.4rem;
    margin-bottom: 1rem;
    padding-bottom: 0.5rem;
    border-bottom: 2px solid var(--border-color);
}

.metrics-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
    gap: 1rem;
}

.metric-card {
    border: 1px solid var(--border-color);
    border-radius: 8px;
    padding: 1.25rem;
}

.metric-card h3 {
    font-size: 0.8rem;
    color: #64748b;
    margin-bottom: 0.5rem;
    text-transform: uppercase;
}

.metric-value { font-size: 1.75rem; font-weight: bold; margin-bottom: 0.5rem; }

.metric-bar { height: 8px; background: #e2e8f0; border-radius: 4px; overflow: hidden; }
.metric-bar-fill { height: 100%; border-radius: 4px; }
.bar-good { background: #10b981; }
.bar-moderate { background: #f59e0b; }
.bar-poor { background: #ef4444; }

table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid var(--border-color); padding: 0.5rem 0.75rem; text-align: left; }
th { background: #f1f5f9; }
tr.critical { background: #fef2f2; border-left: 4px solid #ef4444; }
tr.good { background: #f0fdf4; border-left: 4px solid #22c55e; }

ul { padding-left: 1.5rem; }
.remedy { color: #64748b; }
.remedy::before { content: "→ "; }
.empty { color: #64748b; font-style: italic; }

.footer {
    text-align: center;
    padding: 1.5rem;
    color: #64748b;
    border-top: 1px solid var(--border-color);
}

@media (max-width: 768px) {
    body { padding: 1rem; }
    .header h1 { font-size: 1.5rem; }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthTracker, InMemoryStore, DEFAULT_TREND_EPSILON};
    use crate::reporters::tests::test_result;
    use std::sync::Arc;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<a href=\"x\">'&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_dashboard_html() {
        let tracker = HealthTracker::new(Arc::new(InMemoryStore::new()), DEFAULT_TREND_EPSILON);
        let mut low = test_result();
        low.score = 0.3;
        tracker.record("atlas", &test_result(), None).unwrap();
        tracker.record("<zephyr>", &low, None).unwrap();

        let html = dashboard(&tracker.dashboard(&[], 30).unwrap());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("Healthy Repositories"));
        assert!(html.contains("<tr class=\"critical\"><td>&lt;zephyr&gt;</td>"));
        assert!(!html.contains("<zephyr>"));
        let zephyr = html.find("&lt;zephyr&gt;</td>").unwrap();
        let atlas = html.find("<td>atlas</td>").unwrap();
        assert!(zephyr < atlas);
    }

    #[test]
    fn test_empty_dashboard_html() {
        let tracker = HealthTracker::new(Arc::new(InMemoryStore::new()), DEFAULT_TREND_EPSILON);
        let html = dashboard(&tracker.dashboard(&[], 30).unwrap());
        assert!(html.contains("No health records yet"));
    }

    #[test]
    fn test_repository_html() {
        let tracker = HealthTracker::new(Arc::new(InMemoryStore::new()), DEFAULT_TREND_EPSILON);
        tracker.record("atlas", &test_result(), None).unwrap();
        let report = tracker.repository_report("atlas", 30).unwrap().unwrap();
        let html = repository(&report);
        assert!(html.contains("<title>Repository Health Report: atlas</title>"));
        assert!(html.contains("Historical Trend"));
        assert!(html.contains("missing required directory: schemas"));
        assert!(html.contains("bar-good"));
    }
}
