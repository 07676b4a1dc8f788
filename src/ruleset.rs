//! Ruleset configuration.
//!
//! Handles loading and validating `.tally/rules.toml`. A project ruleset
//! takes precedence over the global one at `~/.tally/rules.toml`; an explicit
//! `--rules` path overrides both.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A complete ruleset: one entry per checked fact.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Ruleset {
    #[serde(default, rename = "fact")]
    pub facts: Vec<FactRule>,
}

/// Whether a fact is a numeric count or a verbatim string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    #[default]
    Count,
    Text,
}

/// One checked fact: how to compute the canonical value and how to
/// recognize assertions of it in documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactRule {
    pub name: String,

    #[serde(default)]
    pub kind: FactKind,

    /// Applies to text facts only; counts always compare numerically.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Regex patterns tried in order per line. Each must carry exactly one
    /// capture group for the asserted value.
    pub patterns: Vec<String>,

    /// Globs (relative to the project root) selecting documents to scan.
    pub documents: Vec<String>,

    pub extract: Extraction,
}

/// Canonical-value extraction strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum Extraction {
    /// Count immediate subdirectories of `path` whose name matches `pattern`.
    DirCount {
        path: String,
        #[serde(default = "default_dir_pattern")]
        pattern: String,
    },

    /// Count files matching a glob.
    FileCount { glob: String },

    /// Read one scalar field from a JSON or TOML manifest by dotted key path.
    ManifestField { path: String, field: String },
}

fn default_true() -> bool {
    true
}

fn default_dir_pattern() -> String {
    "*".to_string()
}

/// Starter ruleset written by `tally init`.
const STARTER_RULESET: &str = r#"# tally ruleset
# Each [[fact]] pairs an extraction rule (the source of truth) with the
# patterns that recognize assertions of that fact in documents.
# Run 'tally rules lint' after editing.

[[fact]]
name = "skills_count"
patterns = ['(\d+) [Ss]kills', '"skills"\s*:\s*(\d+)']
documents = ["README.md"]

[fact.extract]
strategy = "dir-count"
path = "skills"
"#;

impl Ruleset {
    /// Ruleset path inside a project.
    pub fn project_path(root: &Path) -> PathBuf {
        root.join(".tally").join("rules.toml")
    }

    /// Global fallback ruleset path.
    pub fn global_path() -> Result<PathBuf, Error> {
        let home = dirs::home_dir().ok_or(Error::HomeDirNotFound)?;
        Ok(home.join(".tally").join("rules.toml"))
    }

    /// Resolve the active ruleset path: explicit override, then project,
    /// then global.
    pub fn resolve(root: &Path, explicit: Option<&Path>) -> Result<PathBuf, Error> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(Error::RulesetNotFound(path.to_path_buf()));
        }

        let project = Self::project_path(root);
        if project.exists() {
            return Ok(project);
        }

        if let Ok(global) = Self::global_path() {
            if global.exists() {
                return Ok(global);
            }
        }

        Err(Error::RulesetNotFound(project))
    }

    /// Load and validate a ruleset file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::RulesetNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let ruleset: Ruleset =
            toml::from_str(&content).map_err(|e| Error::RulesetParse(e.to_string()))?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Write the starter ruleset into `<root>/.tally/rules.toml`.
    ///
    /// Refuses to overwrite an existing ruleset.
    pub fn scaffold(root: &Path) -> Result<PathBuf, Error> {
        let path = Self::project_path(root);
        if path.exists() {
            return Err(Error::Config(format!(
                "ruleset already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, STARTER_RULESET)?;
        Ok(path)
    }

    /// Validate the whole ruleset. Any failure here is a configuration
    /// error: the run's meaning is undefined, so nothing is checked.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for rule in &self.facts {
            rule.validate()?;
            if !seen.insert(rule.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate fact name: {}",
                    rule.name
                )));
            }
        }
        Ok(())
    }
}

impl FactRule {
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("fact with empty name".to_string()));
        }

        if self.patterns.is_empty() {
            return Err(Error::Config(format!(
                "fact '{}': no scan patterns",
                self.name
            )));
        }
        for pattern in &self.patterns {
            let re = Regex::new(pattern).map_err(|e| {
                Error::Config(format!(
                    "fact '{}': invalid pattern '{}': {}",
                    self.name, pattern, e
                ))
            })?;
            // captures_len counts the implicit whole-match group 0
            if re.captures_len() != 2 {
                return Err(Error::Config(format!(
                    "fact '{}': pattern '{}' must have exactly one capture group",
                    self.name, pattern
                )));
            }
        }

        if self.documents.is_empty() {
            return Err(Error::Config(format!(
                "fact '{}': no documents to scan",
                self.name
            )));
        }
        for doc_glob in &self.documents {
            Pattern::new(doc_glob).map_err(|e| {
                Error::Config(format!(
                    "fact '{}': invalid document glob '{}': {}",
                    self.name, doc_glob, e
                ))
            })?;
        }

        if self.kind == FactKind::Text
            && !matches!(self.extract, Extraction::ManifestField { .. })
        {
            return Err(Error::Config(format!(
                "fact '{}': text facts require manifest-field extraction",
                self.name
            )));
        }

        match &self.extract {
            Extraction::DirCount { pattern, .. } => {
                Pattern::new(pattern).map_err(|e| {
                    Error::Config(format!(
                        "fact '{}': invalid directory pattern '{}': {}",
                        self.name, pattern, e
                    ))
                })?;
            }
            Extraction::FileCount { glob } => {
                Pattern::new(glob).map_err(|e| {
                    Error::Config(format!(
                        "fact '{}': invalid file glob '{}': {}",
                        self.name, glob, e
                    ))
                })?;
            }
            Extraction::ManifestField { field, .. } => {
                if field.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "fact '{}': manifest field path is empty",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Compile this rule's scan patterns, in declaration order.
    pub fn compiled_patterns(&self) -> Result<Vec<Regex>, Error> {
        self.patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    Error::Config(format!(
                        "fact '{}': invalid pattern '{}': {}",
                        self.name, p, e
                    ))
                })
            })
            .collect()
    }
}
