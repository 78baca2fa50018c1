//! Error taxonomy for the validation engine
//!
//! Only schema problems and store I/O abort a run. Snapshot read failures and
//! single remediation failures are recorded where they happen (on a check
//! detail or on an action) and never propagated past that point.

use thiserror::Error;

/// Errors produced by the repohealth library
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown repository type '{name}'. Known types: {known}")]
    SchemaNotFound { name: String, known: String },

    #[error("Invalid schema '{schema}': {reason}")]
    SchemaInvalid { schema: String, reason: String },

    #[error("Cannot read {path}: {reason}")]
    SnapshotRead { path: String, reason: String },

    #[error("Remediation action '{action}' failed: {reason}")]
    RemediationAction { action: String, reason: String },

    #[error("Invalid history window of {days} days (expected 1 to {max})")]
    InvalidWindow { days: i64, max: i64 },

    #[error("Health store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn schema_invalid(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaInvalid {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn store(err: impl std::fmt::Display) -> Self {
        Error::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_not_found_lists_known_types() {
        let err = Error::SchemaNotFound {
            name: "widgets".into(),
            known: "domains, lab".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("widgets"));
        assert!(msg.contains("domains, lab"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
