//! Trend classification and organisation dashboards over a `HealthStore`

use super::HealthStore;
use crate::error::{Error, Result};
use crate::models::{ComplianceLevel, HealthRecord, Trend, ValidationResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Default trend epsilon: score movement smaller than this is "stable"
pub const DEFAULT_TREND_EPSILON: f64 = 0.02;

/// Longest accepted query window (about a century)
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Latest scores at or above this are healthy
pub const HEALTHY_THRESHOLD: f64 = 0.7;
/// Latest scores below this are critical
pub const CRITICAL_THRESHOLD: f64 = 0.4;

/// Classify score movement between the first and last of `scores`
pub fn classify_trend(scores: &[f64], epsilon: f64) -> Trend {
    let (Some(first), Some(last)) = (scores.first(), scores.last()) else {
        return Trend::InsufficientData;
    };
    if scores.len() < 2 {
        return Trend::InsufficientData;
    }
    let delta = last - first;
    if delta > epsilon {
        Trend::Improving
    } else if delta < -epsilon {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// One repository's row in the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub repo_id: String,
    pub score: f64,
    pub grade: String,
    pub compliance_level: ComplianceLevel,
    pub violations: usize,
    pub trend: Trend,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrgSummary {
    pub total: usize,
    pub average_score: f64,
    pub healthy: usize,
    pub critical: usize,
    /// Compliance level name to repository count
    pub level_distribution: BTreeMap<String, usize>,
    /// Trend name to repository ids
    pub trends: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub window_days: i64,
    pub summary: OrgSummary,
    /// Worst first
    pub repositories: Vec<DashboardEntry>,
    pub recommendations: Vec<String>,
}

impl Dashboard {
    pub fn critical(&self) -> impl Iterator<Item = &DashboardEntry> {
        self.repositories
            .iter()
            .filter(|e| e.score < CRITICAL_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub repo_id: String,
    pub window_days: i64,
    pub trend: Trend,
    pub latest: HealthRecord,
    /// Oldest first
    pub history: Vec<HealthRecord>,
}

pub struct HealthTracker {
    store: Arc<dyn HealthStore>,
    epsilon: f64,
}

impl HealthTracker {
    pub fn new(store: Arc<dyn HealthStore>, epsilon: f64) -> Self {
        Self { store, epsilon }
    }

    pub fn store(&self) -> &Arc<dyn HealthStore> {
        &self.store
    }

    /// Append a run. Without an explicit timestamp the record is stamped now,
    /// nudged past the latest record so history stays strictly ordered.
    pub fn record(
        &self,
        repo_id: &str,
        result: &ValidationResult,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<HealthRecord> {
        let timestamp = match timestamp {
            Some(ts) => ts,
            None => {
                let now = now_millis();
                match self.store.latest(repo_id)? {
                    Some(last) if last.timestamp >= now => {
                        last.timestamp + Duration::milliseconds(1)
                    }
                    _ => now,
                }
            }
        };

        let record = HealthRecord {
            repo_id: repo_id.to_string(),
            timestamp,
            result: result.clone(),
        };
        self.store.append(&record)?;
        info!(
            "Recorded {} at {}: score {:.2}",
            repo_id,
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            result.score
        );
        Ok(record)
    }

    /// Records inside the last `days` days (all when `None`), oldest first
    pub fn query(&self, repo_id: &str, days: Option<i64>) -> Result<Vec<HealthRecord>> {
        let since = days.map(window_start).transpose()?;
        self.store.history(repo_id, since)
    }

    pub fn trend(&self, repo_id: &str, days: Option<i64>) -> Result<Trend> {
        let scores: Vec<f64> = self
            .query(repo_id, days)?
            .iter()
            .map(|r| r.result.score)
            .collect();
        Ok(classify_trend(&scores, self.epsilon))
    }

    /// Latest score of each repository, worst first, with its trend.
    /// An empty `repo_ids` means every repository in the store.
    pub fn dashboard(&self, repo_ids: &[String], days: i64) -> Result<Dashboard> {
        window_start(days)?;
        let ids = if repo_ids.is_empty() {
            self.store.repositories()?
        } else {
            repo_ids.to_vec()
        };

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(latest) = self.store.latest(id)? else {
                debug!("No health records for {}", id);
                continue;
            };
            entries.push(DashboardEntry {
                repo_id: id.clone(),
                score: latest.result.score,
                grade: latest.result.health_metrics.overall_health.clone(),
                compliance_level: latest.result.compliance_level,
                violations: latest.result.violations.len(),
                trend: self.trend(id, Some(days))?,
                last_updated: latest.timestamp,
            });
        }

        entries.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.repo_id.cmp(&b.repo_id))
        });

        let summary = summarize(&entries);
        let recommendations = recommendations(&summary);
        Ok(Dashboard {
            generated_at: Utc::now(),
            window_days: days,
            summary,
            repositories: entries,
            recommendations,
        })
    }

    /// Latest status plus the windowed history for one repository
    pub fn repository_report(&self, repo_id: &str, days: i64) -> Result<Option<RepositoryReport>> {
        window_start(days)?;
        let Some(latest) = self.store.latest(repo_id)? else {
            return Ok(None);
        };
        let history = self.query(repo_id, Some(days))?;
        let scores: Vec<f64> = history.iter().map(|r| r.result.score).collect();
        Ok(Some(RepositoryReport {
            repo_id: repo_id.to_string(),
            window_days: days,
            trend: classify_trend(&scores, self.epsilon),
            latest,
            history,
        }))
    }
}

/// Start of a window of `days` days ending now
fn window_start(days: i64) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidWindow {
        days,
        max: MAX_WINDOW_DAYS,
    };
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(invalid());
    }
    Duration::try_days(days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(invalid)
}

// Stores key on milliseconds, so stamps are truncated to match
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn summarize(entries: &[DashboardEntry]) -> OrgSummary {
    let total = entries.len();
    let mut summary = OrgSummary {
        total,
        average_score: if total == 0 {
            0.0
        } else {
            entries.iter().map(|e| e.score).sum::<f64>() / total as f64
        },
        healthy: entries.iter().filter(|e| e.score >= HEALTHY_THRESHOLD).count(),
        critical: entries.iter().filter(|e| e.score < CRITICAL_THRESHOLD).count(),
        ..Default::default()
    };
    for entry in entries {
        *summary
            .level_distribution
            .entry(entry.compliance_level.to_string())
            .or_default() += 1;
        summary
            .trends
            .entry(entry.trend.to_string())
            .or_default()
            .push(entry.repo_id.clone());
    }
    summary
}

fn recommendations(summary: &OrgSummary) -> Vec<String> {
    let mut recs = Vec::new();
    if summary.total == 0 {
        return recs;
    }
    if summary.critical > 0 {
        recs.push(format!(
            "{} repositories have critical issues requiring immediate attention",
            summary.critical
        ));
    }
    if summary.average_score < 0.6 {
        recs.push(
            "Organisation-wide health score is below target (0.60); prioritise the worst repositories"
                .to_string(),
        );
    }
    let low = ["non-compliant", "basic"]
        .iter()
        .filter_map(|l| summary.level_distribution.get(*l))
        .sum::<usize>();
    let low_pct = low as f64 / summary.total as f64 * 100.0;
    if low_pct > 30.0 {
        recs.push(format!(
            "{:.1}% of repositories are at basic compliance or below; adopt organisation-wide standards",
            low_pct
        ));
    }
    if summary.healthy as f64 > summary.total as f64 * 0.7 {
        recs.push("Strong overall repository health; document and share what works".to_string());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::InMemoryStore;
    use crate::models::HealthMetrics;

    fn tracker() -> HealthTracker {
        HealthTracker::new(Arc::new(InMemoryStore::new()), DEFAULT_TREND_EPSILON)
    }

    fn result(score: f64, level: ComplianceLevel) -> ValidationResult {
        ValidationResult {
            score,
            compliance_level: level,
            health_metrics: HealthMetrics {
                overall_health: crate::scoring::grade(score).to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_trend_classification() {
        assert_eq!(classify_trend(&[0.60, 0.70, 0.82], 0.02), Trend::Improving);
        assert_eq!(classify_trend(&[0.80, 0.80], 0.02), Trend::Stable);
        assert_eq!(classify_trend(&[0.90, 0.70], 0.02), Trend::Declining);
        assert_eq!(classify_trend(&[0.50], 0.02), Trend::InsufficientData);
        assert_eq!(classify_trend(&[], 0.02), Trend::InsufficientData);
        assert_eq!(classify_trend(&[0.50, 0.515], 0.02), Trend::Stable);
    }

    #[test]
    fn test_record_keeps_history_ordered() {
        let tracker = tracker();
        for score in [0.60, 0.70, 0.82] {
            tracker
                .record("atlas", &result(score, ComplianceLevel::Basic), None)
                .unwrap();
        }
        let history = tracker.query("atlas", Some(30)).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(tracker.trend("atlas", Some(30)).unwrap(), Trend::Improving);
    }

    #[test]
    fn test_explicit_backdated_record_rejected() {
        let tracker = tracker();
        let now = Utc::now();
        tracker
            .record("atlas", &result(0.5, ComplianceLevel::Basic), Some(now))
            .unwrap();
        let earlier = now - Duration::days(1);
        assert!(tracker
            .record("atlas", &result(0.6, ComplianceLevel::Basic), Some(earlier))
            .is_err());
    }

    #[test]
    fn test_window_excludes_old_records() {
        let tracker = tracker();
        let old = Utc::now() - Duration::days(60);
        tracker
            .record("atlas", &result(0.2, ComplianceLevel::NonCompliant), Some(old))
            .unwrap();
        tracker
            .record("atlas", &result(0.8, ComplianceLevel::Tested), None)
            .unwrap();
        assert_eq!(tracker.query("atlas", Some(30)).unwrap().len(), 1);
        assert_eq!(
            tracker.trend("atlas", Some(30)).unwrap(),
            Trend::InsufficientData
        );
        assert_eq!(tracker.trend("atlas", None).unwrap(), Trend::Improving);
    }

    #[test]
    fn test_out_of_range_window_is_an_error() {
        let tracker = tracker();
        tracker
            .record("atlas", &result(0.8, ComplianceLevel::Tested), None)
            .unwrap();

        for days in [100_000_000, i64::MAX, 0, -5] {
            assert!(matches!(
                tracker.repository_report("atlas", days),
                Err(Error::InvalidWindow { .. })
            ));
            assert!(tracker.dashboard(&[], days).is_err());
            assert!(tracker.query("atlas", Some(days)).is_err());
        }
        assert_eq!(
            tracker
                .repository_report("atlas", MAX_WINDOW_DAYS)
                .unwrap()
                .unwrap()
                .history
                .len(),
            1
        );
    }

    #[test]
    fn test_dashboard_worst_first() {
        let tracker = tracker();
        tracker
            .record("good", &result(0.9, ComplianceLevel::Secure), None)
            .unwrap();
        tracker
            .record("bad", &result(0.3, ComplianceLevel::NonCompliant), None)
            .unwrap();
        tracker
            .record("middling", &result(0.6, ComplianceLevel::Basic), None)
            .unwrap();

        let dashboard = tracker.dashboard(&[], 30).unwrap();
        let order: Vec<&str> = dashboard
            .repositories
            .iter()
            .map(|e| e.repo_id.as_str())
            .collect();
        assert_eq!(order, vec!["bad", "middling", "good"]);
        assert_eq!(dashboard.summary.total, 3);
        assert_eq!(dashboard.summary.healthy, 1);
        assert_eq!(dashboard.summary.critical, 1);
        assert_eq!(dashboard.summary.level_distribution["basic"], 1);
        assert_eq!(dashboard.critical().count(), 1);
        assert!(dashboard.recommendations[0].starts_with("1 repositories"));
    }

    #[test]
    fn test_dashboard_subset_skips_unknown() {
        let tracker = tracker();
        tracker
            .record("atlas", &result(0.9, ComplianceLevel::Secure), None)
            .unwrap();
        let dashboard = tracker
            .dashboard(&["atlas".to_string(), "ghost".to_string()], 30)
            .unwrap();
        assert_eq!(dashboard.repositories.len(), 1);
    }

    #[test]
    fn test_repository_report() {
        let tracker = tracker();
        assert!(tracker.repository_report("atlas", 30).unwrap().is_none());
        tracker
            .record("atlas", &result(0.9, ComplianceLevel::Secure), None)
            .unwrap();
        tracker
            .record("atlas", &result(0.7, ComplianceLevel::Tested), None)
            .unwrap();
        let report = tracker.repository_report("atlas", 30).unwrap().unwrap();
        assert_eq!(report.history.len(), 2);
        assert_eq!(report.trend, Trend::Declining);
        assert_eq!(report.latest.result.score, 0.7);
    }
}
