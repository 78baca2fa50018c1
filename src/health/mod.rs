//! Append-only health history
//!
//! Each validation run can be stored as a [`HealthRecord`] keyed by
//! repository id. Records for one repository are strictly ordered by
//! timestamp; stores reject anything that would reorder history.

mod store;
mod tracker;
mod writer;

pub use store::{InMemoryStore, RedbStore};
pub use tracker::{
    classify_trend, Dashboard, DashboardEntry, HealthTracker, OrgSummary, RepositoryReport,
    CRITICAL_THRESHOLD, DEFAULT_TREND_EPSILON, HEALTHY_THRESHOLD, MAX_WINDOW_DAYS,
};
pub use writer::{SingleWriter, WriteOutcome, WriteRequest};

use crate::error::Result;
use crate::models::HealthRecord;
use chrono::{DateTime, Utc};

/// Storage for health records
pub trait HealthStore: Send + Sync {
    /// Append a record. Fails if its timestamp is not after the latest
    /// record for the same repository.
    fn append(&self, record: &HealthRecord) -> Result<()>;

    /// Records at or after `since`, oldest first
    fn history(&self, repo_id: &str, since: Option<DateTime<Utc>>) -> Result<Vec<HealthRecord>>;

    fn latest(&self, repo_id: &str) -> Result<Option<HealthRecord>>;

    /// Every repository id with at least one record, sorted
    fn repositories(&self) -> Result<Vec<String>>;
}
