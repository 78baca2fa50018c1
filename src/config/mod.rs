//! Configuration module for repohealth
//!
//! This module handles:
//! - Repository-level configuration (repohealth.toml)
//! - Snapshot bounds and exclusions
//! - Remediation and health-store defaults

mod project_config;

pub use project_config::{
    database_path, load_project_config, HealthConfig, ProjectConfig,
    RemediationConfig, ValidationConfig, CONFIG_FILE, DATABASE_ENV, EXAMPLE_CONFIG,
    JSON_CONFIG_FILE,
};
