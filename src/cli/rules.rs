//! Show and validate the active ruleset.

use std::path::Path;

use crate::cli::find_project_root;
use crate::error::{Error, ExitCode};
use crate::ruleset::{Extraction, Ruleset};

/// Run the rules command.
pub fn run(action: &str, rules: Option<&Path>) -> Result<ExitCode, Error> {
    match action {
        "show" => {
            show(rules)?;
            Ok(ExitCode::Pass)
        }
        "lint" => lint(rules),
        _ => {
            println!("Unknown action: {}", action);
            println!("Usage: tally rules [show|lint]");
            Ok(ExitCode::Pass)
        }
    }
}

fn show(rules: Option<&Path>) -> Result<(), Error> {
    let root = find_project_root(&std::env::current_dir()?);

    match Ruleset::resolve(&root, rules) {
        Ok(path) => {
            println!("Ruleset: {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            println!("{}", content);
        }
        Err(Error::RulesetNotFound(_)) => {
            println!("No ruleset found.");
            println!();
            println!("Create one at:");
            println!("  Project: .tally/rules.toml (or run 'tally init')");
            println!("  Global: ~/.tally/rules.toml");
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

fn lint(rules: Option<&Path>) -> Result<ExitCode, Error> {
    let root = find_project_root(&std::env::current_dir()?);
    let path = Ruleset::resolve(&root, rules)?;
    let ruleset = Ruleset::load(&path)?;

    for rule in &ruleset.facts {
        println!(
            "  {}  {}  {} pattern(s), {} document glob(s)",
            rule.name,
            describe(&rule.extract),
            rule.patterns.len(),
            rule.documents.len()
        );
    }
    println!("Ruleset OK: {} fact(s)", ruleset.facts.len());

    Ok(ExitCode::Pass)
}

fn describe(extract: &Extraction) -> String {
    match extract {
        Extraction::DirCount { path, pattern } => format!("dir-count({}/{})", path, pattern),
        Extraction::FileCount { glob } => format!("file-count({})", glob),
        Extraction::ManifestField { path, field } => {
            format!("manifest-field({}#{})", path, field)
        }
    }
}
