//! repohealth - repository compliance validation and health tracking
//!
//! A repository is captured once into an immutable [`snapshot`], checked
//! against its typed [`schema`], scored and placed on a compliance ladder.
//! [`fixes`] plans and applies remediation; [`health`] keeps an append-only
//! history per repository for trends and dashboards.

pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixes;
pub mod health;
pub mod models;
pub mod reporters;
pub mod schema;
pub mod scoring;
pub mod snapshot;
pub mod validator;
pub mod violations;

pub use error::{Error, Result};
pub use validator::{gate, validate_repository, GateOutcome, Validation, Validator};
