//! JSON reporter
//!
//! Pretty-printed JSON for any report type. For validation this is the
//! contract CI consumes, so the output is exactly the serialized struct.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
