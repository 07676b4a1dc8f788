//! Report rendering and the pass/fail gate.
//!
//! Text output is one line per mismatch, `<file>:<line>: expected
//! <fact>=<canonical>, found <asserted>`, then per-fact failures, then a
//! summary line. Output on unchanged input is byte-identical across runs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::json;

use crate::engine::Mismatch;
use crate::error::ExitCode;
use crate::facts::{ExtractionFailure, Fact};
use crate::scan::ScanFailure;

/// Everything a single check run produced.
#[derive(Debug)]
pub struct RunReport {
    pub facts: BTreeMap<String, Fact>,
    pub extraction_failures: Vec<ExtractionFailure>,
    pub scan_failures: Vec<ScanFailure>,
    pub references_checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl RunReport {
    /// Pass iff nothing disagreed and every fact source was readable.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
            && self.extraction_failures.is_empty()
            && self.scan_failures.is_empty()
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.passed() {
            ExitCode::Pass
        } else {
            ExitCode::Inconsistent
        }
    }

    /// Plain-text report for humans and pre-commit output.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for m in &self.mismatches {
            let _ = writeln!(
                out,
                "{}:{}: expected {}={}, found {}",
                m.file.display(),
                m.line,
                m.fact,
                m.expected,
                m.found
            );
        }
        for f in &self.extraction_failures {
            let _ = writeln!(out, "error: {}: {}", f.fact, f.reason);
        }
        for f in &self.scan_failures {
            let _ = writeln!(out, "error: {}: {}", f.fact, f.reason);
        }

        let errors = self.extraction_failures.len() + self.scan_failures.len();
        if self.passed() {
            let _ = writeln!(
                out,
                "ok: {} fact(s), {} reference(s) consistent",
                self.facts.len(),
                self.references_checked
            );
        } else {
            let _ = writeln!(
                out,
                "{} mismatch(es), {} error(s)",
                self.mismatches.len(),
                errors
            );
        }

        out
    }

    /// Machine-readable rendering, grouped by fact.
    pub fn render_json(&self) -> serde_json::Value {
        let facts: Vec<_> = self
            .facts
            .values()
            .map(|fact| {
                let mismatches: Vec<_> = self
                    .mismatches
                    .iter()
                    .filter(|m| m.fact == fact.name)
                    .collect();
                json!({
                    "name": &fact.name,
                    "value": &fact.value,
                    "source": &fact.source,
                    "mismatches": mismatches,
                })
            })
            .collect();

        let errors: Vec<_> = self
            .extraction_failures
            .iter()
            .map(|f| json!({"fact": &f.fact, "reason": &f.reason}))
            .chain(
                self.scan_failures
                    .iter()
                    .map(|f| json!({"fact": &f.fact, "reason": &f.reason})),
            )
            .collect();

        json!({
            "pass": self.passed(),
            "facts": facts,
            "errors": errors,
            "references_checked": self.references_checked,
            "mismatch_count": self.mismatches.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactValue;
    use std::path::PathBuf;

    fn fact(name: &str, value: FactValue) -> (String, Fact) {
        (
            name.to_string(),
            Fact {
                name: name.to_string(),
                value,
                source: "dir-count(skills/*)".to_string(),
            },
        )
    }

    fn report_with_mismatch() -> RunReport {
        RunReport {
            facts: [fact("skills_count", FactValue::Count(12))].into_iter().collect(),
            extraction_failures: vec![],
            scan_failures: vec![],
            references_checked: 1,
            mismatches: vec![Mismatch {
                fact: "skills_count".to_string(),
                file: PathBuf::from("README.md"),
                line: 5,
                expected: "12".to_string(),
                found: "9".to_string(),
            }],
        }
    }

    #[test]
    fn test_mismatch_line_format() {
        let text = report_with_mismatch().render_text();
        assert!(text.starts_with("README.md:5: expected skills_count=12, found 9\n"));
        assert!(text.contains("1 mismatch(es), 0 error(s)"));
    }

    #[test]
    fn test_pass_report() {
        let report = RunReport {
            facts: [fact("skills_count", FactValue::Count(12))].into_iter().collect(),
            extraction_failures: vec![],
            scan_failures: vec![],
            references_checked: 2,
            mismatches: vec![],
        };
        assert!(report.passed());
        assert_eq!(report.exit_code(), ExitCode::Pass);
        assert_eq!(report.render_text(), "ok: 1 fact(s), 2 reference(s) consistent\n");
    }

    #[test]
    fn test_extraction_failure_fails_the_gate() {
        let report = RunReport {
            facts: BTreeMap::new(),
            extraction_failures: vec![ExtractionFailure {
                fact: "agents_count".to_string(),
                reason: "source path does not exist: agents".to_string(),
            }],
            scan_failures: vec![],
            references_checked: 0,
            mismatches: vec![],
        };
        assert!(!report.passed());
        assert_eq!(report.exit_code(), ExitCode::Inconsistent);
        let text = report.render_text();
        assert!(text.contains("error: agents_count: source path does not exist: agents"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let report = report_with_mismatch();
        assert_eq!(report.render_text(), report.render_text());
        assert_eq!(report.render_json(), report.render_json());
    }

    #[test]
    fn test_json_groups_mismatches_by_fact() {
        let value = report_with_mismatch().render_json();
        assert_eq!(value["pass"], false);
        assert_eq!(value["facts"][0]["name"], "skills_count");
        assert_eq!(value["facts"][0]["mismatches"][0]["line"], 5);
        assert_eq!(value["mismatch_count"], 1);
    }
}
