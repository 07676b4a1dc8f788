//! Consistency comparison.
//!
//! Pairs every scanned reference with its canonical fact and emits one
//! mismatch per disagreement. Output is sorted by (document path, line,
//! fact name) so reports are deterministic regardless of scan order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::error::Error;
use crate::facts::{Fact, FactValue};
use crate::ruleset::{FactKind, FactRule, Ruleset};
use crate::scan::Reference;

/// A reference whose asserted value disagrees with the canonical fact.
#[derive(Debug, Clone, Serialize)]
pub struct Mismatch {
    pub fact: String,
    pub file: PathBuf,
    pub line: usize,
    pub expected: String,
    pub found: String,
}

/// Compare references against canonical facts.
///
/// References to facts whose extraction or scanning failed are skipped (the
/// failure is reported separately). A reference to a fact name absent from
/// the ruleset is a configuration error.
pub fn compare(
    ruleset: &Ruleset,
    facts: &BTreeMap<String, Fact>,
    failed: &BTreeSet<String>,
    references: &[Reference],
) -> Result<Vec<Mismatch>, Error> {
    let rules: BTreeMap<&str, &FactRule> = ruleset
        .facts
        .iter()
        .map(|r| (r.name.as_str(), r))
        .collect();

    let mut mismatches = Vec::new();

    for reference in references {
        if failed.contains(&reference.fact) {
            continue;
        }

        let rule = rules.get(reference.fact.as_str()).ok_or_else(|| {
            Error::Config(format!("reference to undefined fact: {}", reference.fact))
        })?;
        let fact = facts.get(&reference.fact).ok_or_else(|| {
            Error::Config(format!("reference to undefined fact: {}", reference.fact))
        })?;

        let asserted = normalize(&reference.value);
        if !values_agree(&fact.value, asserted, rule) {
            mismatches.push(Mismatch {
                fact: reference.fact.clone(),
                file: reference.file.clone(),
                line: reference.line,
                expected: fact.value.to_string(),
                found: asserted.to_string(),
            });
        }
    }

    mismatches.sort_by(|a, b| {
        (&a.file, a.line, &a.fact).cmp(&(&b.file, b.line, &b.fact))
    });

    Ok(mismatches)
}

/// Strip surrounding punctuation and whitespace from an asserted value.
fn normalize(raw: &str) -> &str {
    raw.trim().trim_matches(|c: char| {
        matches!(
            c,
            '"' | '\'' | '`' | '.' | ',' | ':' | ';' | '(' | ')' | '[' | ']' | '*' | '_'
        )
    })
}

fn values_agree(canonical: &FactValue, asserted: &str, rule: &FactRule) -> bool {
    match canonical {
        FactValue::Count(expected) => {
            // Tolerate thousands separators ("1,234")
            match asserted.replace(',', "").parse::<u64>() {
                Ok(found) => found == *expected,
                Err(_) => false,
            }
        }
        FactValue::Text(expected) => match rule.kind {
            FactKind::Text if !rule.case_sensitive => {
                expected.eq_ignore_ascii_case(asserted)
            }
            _ => expected == asserted,
        },
    }
}
