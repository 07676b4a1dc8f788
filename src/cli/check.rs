//! Run the consistency check.
//!
//! Pipeline: load ruleset, extract canonical facts, scan documents,
//! compare, report. Stateless; nothing is cached between runs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use crate::cli::find_project_root;
use crate::engine;
use crate::error::{Error, ExitCode};
use crate::facts;
use crate::report::RunReport;
use crate::ruleset::Ruleset;
use crate::scan;

#[derive(Debug, Default)]
pub struct CheckOptions {
    /// Explicit ruleset path, overriding project and global rulesets.
    pub rules: Option<PathBuf>,
    /// Project root; discovered from the working directory when absent.
    pub root: Option<PathBuf>,
    /// Emit the report as JSON instead of plain text.
    pub json: bool,
}

/// Run the check command. Returns the gate's exit code.
pub fn run(options: CheckOptions) -> Result<ExitCode, Error> {
    let root = match options.root {
        Some(root) => root,
        None => find_project_root(&std::env::current_dir()?),
    };

    let report = check(&root, options.rules.as_deref())?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report.render_json())?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(report.exit_code())
}

/// The full pipeline, separated from printing so tests can inspect reports.
pub fn check(root: &std::path::Path, rules: Option<&std::path::Path>) -> Result<RunReport, Error> {
    let ruleset_path = Ruleset::resolve(root, rules)?;
    info!(ruleset = %ruleset_path.display(), root = %root.display(), "checking");
    let ruleset = Ruleset::load(&ruleset_path)?;

    let extracted = facts::extract_all(root, &ruleset);
    let scanned = scan::scan_all(root, &ruleset)?;

    let failed: BTreeSet<String> = extracted
        .failures
        .iter()
        .map(|f| f.fact.clone())
        .chain(scanned.failures.iter().map(|f| f.fact.clone()))
        .collect();

    let mismatches = engine::compare(&ruleset, &extracted.facts, &failed, &scanned.references)?;

    Ok(RunReport {
        facts: extracted.facts,
        extraction_failures: extracted.failures,
        scan_failures: scanned.failures,
        references_checked: scanned.references.len(),
        mismatches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RULES: &str = r#"
[[fact]]
name = "skills_count"
patterns = ['(\d+) [Ss]kills', '"skills"\s*:\s*(\d+)']
documents = ["README.md", "marketplace.json"]

[fact.extract]
strategy = "dir-count"
path = "skills"
"#;

    fn project(rules: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let tally_dir = temp.path().join(".tally");
        std::fs::create_dir_all(&tally_dir).unwrap();
        std::fs::write(tally_dir.join("rules.toml"), rules).unwrap();
        temp
    }

    fn make_skill_dirs(temp: &TempDir, count: usize) {
        for i in 0..count {
            std::fs::create_dir_all(temp.path().join(format!("skills/skill-{}", i))).unwrap();
        }
    }

    #[test]
    fn test_stale_count_is_one_mismatch() {
        let temp = project(RULES);
        make_skill_dirs(&temp, 12);
        std::fs::write(
            temp.path().join("README.md"),
            "# Plugin\n\nWhat you get:\n\n- 9 Skills\n",
        )
        .unwrap();

        let report = check(temp.path(), None).unwrap();
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(
            report.render_text().lines().next().unwrap(),
            "README.md:5: expected skills_count=12, found 9"
        );
        assert_eq!(report.exit_code(), ExitCode::Inconsistent);
    }

    #[test]
    fn test_consistent_corpus_passes() {
        let temp = project(RULES);
        make_skill_dirs(&temp, 12);
        std::fs::write(temp.path().join("README.md"), "- 12 Skills\n").unwrap();
        std::fs::write(temp.path().join("marketplace.json"), "{\"skills\": 12}\n").unwrap();

        let report = check(temp.path(), None).unwrap();
        assert!(report.passed());
        assert_eq!(report.references_checked, 2);
        assert_eq!(report.exit_code(), ExitCode::Pass);
    }

    #[test]
    fn test_missing_source_is_isolated() {
        let rules = r#"
[[fact]]
name = "skills_count"
patterns = ['(\d+) skills']
documents = ["README.md"]
[fact.extract]
strategy = "dir-count"
path = "skills"

[[fact]]
name = "agents_count"
patterns = ['(\d+) agents']
documents = ["README.md"]
[fact.extract]
strategy = "dir-count"
path = "agents"
"#;
        let temp = project(rules);
        make_skill_dirs(&temp, 2);
        std::fs::write(temp.path().join("README.md"), "2 skills, 4 agents\n").unwrap();

        let report = check(temp.path(), None).unwrap();
        // agents_count failed to extract; skills_count was still checked
        assert_eq!(report.extraction_failures.len(), 1);
        assert_eq!(report.extraction_failures[0].fact, "agents_count");
        assert!(report.mismatches.is_empty());
        assert_eq!(report.exit_code(), ExitCode::Inconsistent);
    }

    #[test]
    fn test_broken_ruleset_produces_no_report() {
        let temp = project(
            r#"
[[fact]]
name = "widgets_count"
patterns = ['(\d+) widgets']
documents = ["README.md"]
"#,
        );
        std::fs::write(temp.path().join("README.md"), "3 widgets\n").unwrap();

        let err = check(temp.path(), None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_report_is_byte_identical_across_runs() {
        let temp = project(RULES);
        make_skill_dirs(&temp, 12);
        std::fs::write(
            temp.path().join("README.md"),
            "9 Skills here\nand 8 skills there\n",
        )
        .unwrap();

        let first = check(temp.path(), None).unwrap().render_text();
        let second = check(temp.path(), None).unwrap().render_text();
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_ruleset_override() {
        let temp = TempDir::new().unwrap();
        make_skill_dirs(&temp, 1);
        std::fs::write(temp.path().join("README.md"), "1 skills\n").unwrap();
        let custom = temp.path().join("custom-rules.toml");
        std::fs::write(
            &custom,
            r#"
[[fact]]
name = "skills_count"
patterns = ['(\d+) skills']
documents = ["README.md"]
[fact.extract]
strategy = "dir-count"
path = "skills"
"#,
        )
        .unwrap();

        let report = check(temp.path(), Some(&custom)).unwrap();
        assert!(report.passed());
    }
}
