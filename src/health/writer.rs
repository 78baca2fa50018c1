//! Single writer thread for concurrent validation runs
//!
//! Workers validate repositories in parallel and send results here; one
//! thread owns every append so per-repository ordering is never raced.

use super::HealthTracker;
use crate::models::{HealthRecord, ValidationResult};
use crossbeam_channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Results in flight before senders block
const CHANNEL_CAPACITY: usize = 64;

/// A validation run waiting to be recorded
#[derive(Debug)]
pub struct WriteRequest {
    pub repo_id: String,
    pub result: ValidationResult,
}

#[derive(Debug)]
pub struct WriteOutcome {
    pub repo_id: String,
    pub outcome: std::result::Result<HealthRecord, String>,
}

pub struct SingleWriter {
    sender: Sender<WriteRequest>,
    handle: JoinHandle<Vec<WriteOutcome>>,
}

impl SingleWriter {
    pub fn spawn(tracker: Arc<HealthTracker>) -> Self {
        let (tx, rx) = bounded::<WriteRequest>(CHANNEL_CAPACITY);
        let handle = thread::spawn(move || {
            let mut outcomes = Vec::new();
            for request in rx {
                let outcome = tracker
                    .record(&request.repo_id, &request.result, None)
                    .map_err(|e| {
                        warn!("Failed to record {}: {}", request.repo_id, e);
                        e.to_string()
                    });
                outcomes.push(WriteOutcome {
                    repo_id: request.repo_id,
                    outcome,
                });
            }
            outcomes
        });
        Self { sender: tx, handle }
    }

    /// A sender for worker threads. Clone it per worker.
    pub fn sender(&self) -> Sender<WriteRequest> {
        self.sender.clone()
    }

    /// Close the channel and wait for queued writes. Outcomes are in
    /// arrival order.
    pub fn finish(self) -> Vec<WriteOutcome> {
        let Self { sender, handle } = self;
        drop(sender);
        match handle.join() {
            Ok(outcomes) => outcomes,
            Err(_) => {
                warn!("Health writer thread panicked");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{InMemoryStore, DEFAULT_TREND_EPSILON};
    use std::sync::Arc;

    #[test]
    fn test_concurrent_senders_single_writer() {
        let tracker = Arc::new(HealthTracker::new(
            Arc::new(InMemoryStore::new()),
            DEFAULT_TREND_EPSILON,
        ));
        let writer = SingleWriter::spawn(Arc::clone(&tracker));

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let tx = writer.sender();
                thread::spawn(move || {
                    for i in 0..10 {
                        let result = ValidationResult {
                            score: i as f64 / 10.0,
                            ..Default::default()
                        };
                        tx.send(WriteRequest {
                            repo_id: format!("repo-{}", w % 2),
                            result,
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let outcomes = writer.finish();
        assert_eq!(outcomes.len(), 40);
        assert!(outcomes.iter().all(|o| o.outcome.is_ok()));

        for repo in ["repo-0", "repo-1"] {
            let history = tracker.query(repo, None).unwrap();
            assert_eq!(history.len(), 20);
            assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }
    }
}
