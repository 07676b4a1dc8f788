//! Canonical fact extraction.
//!
//! Computes one authoritative value per ruleset entry from the filesystem:
//! directory counts, file counts, or a scalar field read from a manifest.
//! A missing source is an extraction failure, never a silent zero.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::debug;

use crate::ruleset::{Extraction, FactKind, FactRule, Ruleset};

/// A canonical value: integer count or verbatim string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    Count(u64),
    Text(String),
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Count(n) => write!(f, "{}", n),
            FactValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A fact with its canonical value and provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Fact {
    pub name: String,
    pub value: FactValue,
    /// Which extraction rule produced the value, e.g. `dir-count(skills/*)`.
    pub source: String,
}

/// A fact whose source could not be read. Isolated per fact: the run
/// continues checking the others.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub fact: String,
    pub reason: String,
}

/// Result of extracting every fact in a ruleset.
#[derive(Debug, Default)]
pub struct Extracted {
    pub facts: BTreeMap<String, Fact>,
    pub failures: Vec<ExtractionFailure>,
}

/// Extract canonical values for every fact in the ruleset.
pub fn extract_all(root: &Path, ruleset: &Ruleset) -> Extracted {
    let mut extracted = Extracted::default();

    for rule in &ruleset.facts {
        match extract_one(root, rule) {
            Ok(fact) => {
                debug!(fact = %fact.name, value = %fact.value, "extracted");
                extracted.facts.insert(fact.name.clone(), fact);
            }
            Err(reason) => {
                debug!(fact = %rule.name, %reason, "extraction failed");
                extracted.failures.push(ExtractionFailure {
                    fact: rule.name.clone(),
                    reason,
                });
            }
        }
    }

    extracted
}

fn extract_one(root: &Path, rule: &FactRule) -> Result<Fact, String> {
    let (value, source) = match &rule.extract {
        Extraction::DirCount { path, pattern } => (
            FactValue::Count(dir_count(root, path, pattern)?),
            format!("dir-count({}/{})", path, pattern),
        ),
        Extraction::FileCount { glob } => (
            FactValue::Count(file_count(root, glob)?),
            format!("file-count({})", glob),
        ),
        Extraction::ManifestField { path, field } => (
            manifest_field(root, path, field, rule.kind)?,
            format!("manifest-field({}#{})", path, field),
        ),
    };

    Ok(Fact {
        name: rule.name.clone(),
        value,
        source,
    })
}

fn dir_match_options() -> MatchOptions {
    MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    }
}

/// Count immediate subdirectories of `path` matching `pattern`.
fn dir_count(root: &Path, path: &str, pattern: &str) -> Result<u64, String> {
    let dir = root.join(path);
    if !dir.is_dir() {
        return Err(format!("source path does not exist: {}", path));
    }

    let matcher = Pattern::new(pattern).map_err(|e| e.to_string())?;
    let options = dir_match_options();

    let mut count = 0;
    let entries = fs::read_dir(&dir).map_err(|e| format!("cannot read {}: {}", path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("cannot read {}: {}", path, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        if matcher.matches_with(&name.to_string_lossy(), options) {
            count += 1;
        }
    }

    Ok(count)
}

/// Count files matching a glob relative to the project root.
fn file_count(root: &Path, glob_pattern: &str) -> Result<u64, String> {
    // The fixed prefix must exist so "no such directory" is distinguished
    // from a legitimate zero matches.
    let base = root.join(static_prefix(glob_pattern));
    if !base.exists() {
        return Err(format!(
            "source path does not exist: {}",
            static_prefix(glob_pattern)
        ));
    }

    let full = root.join(glob_pattern);
    let paths = glob::glob(&full.to_string_lossy()).map_err(|e| e.to_string())?;

    let mut count = 0;
    for entry in paths {
        let path = entry.map_err(|e| format!("cannot read {}: {}", glob_pattern, e))?;
        if path.is_file() {
            count += 1;
        }
    }

    Ok(count)
}

/// The leading glob components with no wildcard characters.
fn static_prefix(glob_pattern: &str) -> String {
    glob_pattern
        .split('/')
        .take_while(|seg| !seg.contains(['*', '?', '[']))
        .collect::<Vec<_>>()
        .join("/")
}

/// Read one scalar field from a JSON or TOML manifest.
fn manifest_field(
    root: &Path,
    path: &str,
    field: &str,
    kind: FactKind,
) -> Result<FactValue, String> {
    let file = root.join(path);
    if !file.is_file() {
        return Err(format!("manifest does not exist: {}", path));
    }
    let content =
        fs::read_to_string(&file).map_err(|e| format!("cannot read {}: {}", path, e))?;

    let is_toml = file.extension().and_then(|e| e.to_str()) == Some("toml");
    let parsed: serde_json::Value = if is_toml {
        let value: toml::Value =
            toml::from_str(&content).map_err(|e| format!("cannot parse {}: {}", path, e))?;
        serde_json::to_value(value).map_err(|e| e.to_string())?
    } else {
        serde_json::from_str(&content).map_err(|e| format!("cannot parse {}: {}", path, e))?
    };

    let raw = lookup_field(&parsed, field)
        .ok_or_else(|| format!("field '{}' not found in {}", field, path))?;

    match kind {
        FactKind::Count => match raw {
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(FactValue::Count)
                .ok_or_else(|| format!("field '{}' is not a non-negative integer", field)),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map(FactValue::Count)
                .map_err(|_| format!("field '{}' is not a count: {:?}", field, s)),
            _ => Err(format!("field '{}' is not a number", field)),
        },
        FactKind::Text => match raw {
            serde_json::Value::String(s) => Ok(FactValue::Text(s.clone())),
            serde_json::Value::Number(n) => Ok(FactValue::Text(n.to_string())),
            serde_json::Value::Bool(b) => Ok(FactValue::Text(b.to_string())),
            _ => Err(format!("field '{}' is not a scalar", field)),
        },
    }
}

/// Navigate a dotted key path; numeric segments index into arrays.
fn lookup_field<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in field.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
