//! Schema registry: loads, validates and indexes repository-type schemas
//!
//! The registry is an explicit value passed to each validation run. It is
//! read-only after construction and safe to share between threads.

use super::{LevelSpec, RepositoryTypeSchema};
use crate::error::{Error, Result};
use crate::models::ComplianceLevel;
use crate::snapshot::RepositorySnapshot;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// The built-in schema document
pub const BUILTIN_SCHEMA: &str = include_str!("../../schemas/fcm-repository.json");

/// Type used when detection finds nothing better
pub const FALLBACK_TYPE: &str = "generic";

/// Minimum Jaccard similarity for directory-based detection
const MIN_DETECTION_SIMILARITY: f64 = 0.1;

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    defaults: Value,
    #[serde(default)]
    repository_schemas: BTreeMap<String, Value>,
}

/// Indexed, validated repository-type schemas
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, RepositoryTypeSchema>,
}

impl SchemaRegistry {
    /// Registry built from the embedded document
    pub fn builtin() -> Result<Self> {
        let doc: Value = serde_json::from_str(BUILTIN_SCHEMA)?;
        Self::from_document(doc, "builtin")
    }

    /// Load a schema document from disk. `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = path.display().to_string();
        let content = std::fs::read_to_string(path)?;
        let doc: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| Error::schema_invalid(&source, e.to_string()))?,
            _ => serde_json::from_str(&content)
                .map_err(|e| Error::schema_invalid(&source, e.to_string()))?,
        };
        Self::from_document(doc, &source)
    }

    /// Resolve every type in a document against its defaults and validate it
    pub fn from_document(doc: Value, source: &str) -> Result<Self> {
        let doc: SchemaDocument = serde_json::from_value(doc)
            .map_err(|e| Error::schema_invalid(source, e.to_string()))?;

        let mut entries = doc.repository_schemas;
        entries
            .entry(FALLBACK_TYPE.to_string())
            .or_insert_with(|| Value::Object(Default::default()));

        let mut schemas = BTreeMap::new();
        for (name, overlay) in entries {
            let mut resolved = doc.defaults.clone();
            merge(&mut resolved, overlay);
            if let Value::Object(map) = &mut resolved {
                map.insert("name".to_string(), Value::String(name.clone()));
            }
            let schema: RepositoryTypeSchema = serde_json::from_value(resolved)
                .map_err(|e| Error::schema_invalid(&name, e.to_string()))?;
            validate(&schema)?;
            debug!(
                "Loaded schema '{}' from {} ({} dirs, {} files)",
                name,
                source,
                schema.required_directories.len(),
                schema.required_files.len()
            );
            schemas.insert(name, schema);
        }

        Ok(Self { schemas })
    }

    /// Look up a repository type
    pub fn load(&self, name: &str) -> Result<&RepositoryTypeSchema> {
        self.schemas.get(name).ok_or_else(|| Error::SchemaNotFound {
            name: name.to_string(),
            known: self.type_names().join(", "),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.schemas.keys().map(|k| k.as_str()).collect()
    }

    pub fn fallback(&self) -> &RepositoryTypeSchema {
        // Always inserted by from_document
        &self.schemas[FALLBACK_TYPE]
    }

    /// Explicit type, or detection when the request is absent or `auto`
    pub fn resolve(
        &self,
        requested: Option<&str>,
        snapshot: &RepositorySnapshot,
    ) -> Result<&RepositoryTypeSchema> {
        match requested {
            None | Some("auto") => Ok(self.detect_type(snapshot)),
            Some(name) => self.load(name),
        }
    }

    /// Pick a schema for a snapshot. Never fails: the manifest's declared
    /// type wins, then the closest required-directory set, then the fallback.
    pub fn detect_type(&self, snapshot: &RepositorySnapshot) -> &RepositoryTypeSchema {
        if let Some(declared) = self.declared_type(snapshot) {
            debug!("Repository type '{}' declared by manifest", declared);
            return &self.schemas[&declared];
        }

        let present: BTreeSet<&str> = snapshot.top_level_dirs().collect();
        let mut best: Option<(&RepositoryTypeSchema, f64)> = None;
        for schema in self.schemas.values() {
            if schema.name == FALLBACK_TYPE || schema.required_directories.is_empty() {
                continue;
            }
            let required: BTreeSet<&str> = schema
                .required_directories
                .iter()
                .filter_map(|d| d.split('/').next())
                .collect();
            let similarity = jaccard(&present, &required);
            match best {
                Some((_, score)) if similarity <= score => {}
                _ => best = Some((schema, similarity)),
            }
        }

        match best {
            Some((schema, similarity)) if similarity > MIN_DETECTION_SIMILARITY => {
                debug!(
                    "Detected repository type '{}' (similarity {:.2})",
                    schema.name, similarity
                );
                schema
            }
            _ => {
                debug!("No schema matched, using '{}'", FALLBACK_TYPE);
                self.fallback()
            }
        }
    }

    fn declared_type(&self, snapshot: &RepositorySnapshot) -> Option<String> {
        let rules = &self.fallback().content.manifest;
        if !snapshot.has_file(&rules.path) {
            return None;
        }
        let content = snapshot.read(&rules.path).ok()?;
        let manifest: Value = serde_json::from_str(&content).ok()?;
        let declared = manifest.get(&rules.category_field)?.as_str()?;
        self.contains(declared).then(|| declared.to_string())
    }
}

fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Deep merge: objects merge per key, everything else is replaced
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Load-time contract checks for one resolved schema
fn validate(schema: &RepositoryTypeSchema) -> Result<()> {
    let name = schema.name.as_str();

    if !schema.weights.is_valid() {
        return Err(Error::schema_invalid(
            name,
            format!(
                "category weights must be non-negative and sum to 1.0 (got {:.6})",
                schema.weights.sum()
            ),
        ));
    }

    for (label, pattern) in [
        ("naming.directory_pattern", &schema.naming.directory_pattern),
        ("naming.file_pattern", &schema.naming.file_pattern),
        ("naming.model_id_pattern", &schema.naming.model_id_pattern),
        ("content.models.name_pattern", &schema.content.models.name_pattern),
    ] {
        Regex::new(pattern)
            .map_err(|e| Error::schema_invalid(name, format!("{} is not a valid regex: {}", label, e)))?;
    }

    validate_ladder(name, &schema.ladder)?;

    let known: BTreeSet<String> = schema.check_names().into_iter().collect();
    for level in &schema.ladder {
        for (req_name, requirement) in &level.requirements {
            let mut referenced = Vec::new();
            requirement.referenced_checks(&mut referenced);
            if let Some(unknown) = referenced.iter().find(|c| !known.contains(**c)) {
                return Err(Error::schema_invalid(
                    name,
                    format!(
                        "requirement '{}' of level '{}' references check '{}', which this schema never produces",
                        req_name, level.name, unknown
                    ),
                ));
            }
        }
    }

    for dir in &schema.required_directories {
        if dir.is_empty() || dir.starts_with('/') || dir.split('/').any(|c| c == "..") {
            return Err(Error::schema_invalid(
                name,
                format!("required directory '{}' must be a relative path", dir),
            ));
        }
    }
    Ok(())
}

/// Six named levels, each a superset of the one below
fn validate_ladder(name: &str, ladder: &[LevelSpec]) -> Result<()> {
    if ladder.len() != ComplianceLevel::LADDER.len() {
        return Err(Error::schema_invalid(
            name,
            format!(
                "compliance ladder must have {} levels, found {}",
                ComplianceLevel::LADDER.len(),
                ladder.len()
            ),
        ));
    }

    for (index, (spec, level)) in ladder.iter().zip(ComplianceLevel::LADDER).enumerate() {
        if spec.name != level.as_str() {
            return Err(Error::schema_invalid(
                name,
                format!(
                    "ladder level {} must be named '{}', found '{}'",
                    index, level, spec.name
                ),
            ));
        }
    }

    for pair in ladder.windows(2) {
        let (lower, higher) = (&pair[0], &pair[1]);
        for (req_name, requirement) in &lower.requirements {
            match higher.requirements.get(req_name) {
                Some(r) if r == requirement => {}
                Some(_) => {
                    return Err(Error::schema_invalid(
                        name,
                        format!(
                            "level '{}' redefines requirement '{}' from level '{}'",
                            higher.name, req_name, lower.name
                        ),
                    ))
                }
                None => {
                    return Err(Error::schema_invalid(
                        name,
                        format!(
                            "level '{}' is not cumulative: it drops requirement '{}' of level '{}'",
                            higher.name, req_name, lower.name
                        ),
                    ))
                }
            }
        }
    }

    Ok(())
}
