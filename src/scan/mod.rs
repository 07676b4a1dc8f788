//! Reference scanning.
//!
//! Finds textual assertions of facts inside documents. Patterns are matched
//! per line; each rule's patterns are tried in declaration order and the
//! first that matches a line wins, so a line contributes at most one
//! reference per fact. Documents are never mutated.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::Error;
use crate::ruleset::{FactRule, Ruleset};

/// One textual assertion of a fact's value.
#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    pub fact: String,
    /// Document path relative to the project root.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// The full matched span.
    pub matched: String,
    /// The captured asserted value, raw.
    pub value: String,
}

/// A fact whose documents could not be scanned. Isolated per fact, like an
/// extraction failure.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub fact: String,
    pub reason: String,
}

/// Result of scanning every document set in a ruleset.
#[derive(Debug, Default)]
pub struct Scanned {
    pub references: Vec<Reference>,
    pub failures: Vec<ScanFailure>,
}

/// Scan each rule's document set for references to its fact.
pub fn scan_all(root: &Path, ruleset: &Ruleset) -> Result<Scanned, Error> {
    let mut scanned = Scanned::default();

    for rule in &ruleset.facts {
        let regexes = rule.compiled_patterns()?;
        match scan_rule(root, rule, &regexes) {
            Ok(mut references) => {
                debug!(fact = %rule.name, count = references.len(), "scanned");
                scanned.references.append(&mut references);
            }
            Err(reason) => {
                debug!(fact = %rule.name, %reason, "scan failed");
                scanned.failures.push(ScanFailure {
                    fact: rule.name.clone(),
                    reason,
                });
            }
        }
    }

    Ok(scanned)
}

fn scan_rule(root: &Path, rule: &FactRule, regexes: &[Regex]) -> Result<Vec<Reference>, String> {
    let mut references = Vec::new();
    for path in select_documents(root, rule)? {
        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_path_buf();
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", relative.display(), e))?;
        scan_document(&content, &relative, rule, regexes, &mut references);
    }
    Ok(references)
}

/// Files selected by the rule's document globs, deduplicated and sorted.
fn select_documents(root: &Path, rule: &FactRule) -> Result<BTreeSet<PathBuf>, String> {
    let mut documents = BTreeSet::new();
    for doc_glob in &rule.documents {
        let full = root.join(doc_glob);
        let paths = glob::glob(&full.to_string_lossy()).map_err(|e| e.to_string())?;
        for entry in paths {
            let path = entry.map_err(|e| format!("cannot read {}: {}", doc_glob, e))?;
            if path.is_file() {
                documents.insert(path);
            }
        }
    }
    Ok(documents)
}

fn scan_document(
    content: &str,
    file: &Path,
    rule: &FactRule,
    regexes: &[Regex],
    references: &mut Vec<Reference>,
) {
    for (idx, line) in content.lines().enumerate() {
        // First matching pattern wins for this line.
        for re in regexes {
            if let Some(caps) = re.captures(line) {
                let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let value = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                references.push(Reference {
                    fact: rule.name.clone(),
                    file: file.to_path_buf(),
                    line: idx + 1,
                    matched: matched.to_string(),
                    value: value.to_string(),
                });
                break;
            }
        }
    }
}
