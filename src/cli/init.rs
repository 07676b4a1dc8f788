//! Initialize tally for a project.

use tracing::{info, warn};

use crate::cli::hooks;
use crate::error::Error;
use crate::ruleset::Ruleset;

/// Run the init command.
pub fn run(no_hooks: bool) -> Result<(), Error> {
    let project_root = std::env::current_dir()?;

    // Check if already initialized
    if Ruleset::project_path(&project_root).exists() {
        println!("tally already initialized in this project.");
        println!("Edit .tally/rules.toml to change what gets checked.");
        return Ok(());
    }

    let path = Ruleset::scaffold(&project_root)?;
    info!(path = %path.display(), "Created ruleset");
    println!("Created .tally/rules.toml");

    if !no_hooks && hooks::has_git(&project_root) {
        if let Err(e) = hooks::install_hook(&project_root) {
            warn!(error = %e, "Failed to install git hook");
        } else {
            println!("Pre-commit hook installed.");
        }
    }

    println!();
    println!("Edit .tally/rules.toml to describe your project's facts,");
    println!("then run 'tally check' to verify your documents.");

    Ok(())
}
