//! Git hook installation and management.
//!
//! The pre-commit hook runs `tally check` and blocks the commit on any
//! inconsistency. Installed content lives between marker comments so
//! unrelated hook lines survive install and uninstall.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::info;

use crate::error::Error;

/// Managed block markers.
const BLOCK_START: &str = "# BEGIN tally pre-commit check";
const BLOCK_END: &str = "# END tally pre-commit check";

/// Pre-commit hook body.
const PRE_COMMIT_HOOK: &str = r#"if ! tally check; then
    echo "Commit blocked: documentation is out of sync. Run 'tally check' for details."
    exit 1
fi"#;

fn managed_block() -> String {
    format!("{}\n{}\n{}", BLOCK_START, PRE_COMMIT_HOOK, BLOCK_END)
}

/// Check if git is initialized in the project.
pub fn has_git(project_root: &Path) -> bool {
    project_root.join(".git").exists()
}

/// Check if the tally hook is already installed.
pub fn hook_installed(project_root: &Path) -> bool {
    let hook_path = project_root.join(".git").join("hooks").join("pre-commit");
    if !hook_path.exists() {
        return false;
    }
    fs::read_to_string(&hook_path)
        .map(|content| content.contains(BLOCK_START))
        .unwrap_or(false)
}

/// Install the pre-commit hook, preserving existing hook content.
pub fn install_hook(project_root: &Path) -> Result<(), Error> {
    let git_dir = project_root.join(".git");
    if !git_dir.exists() {
        return Ok(()); // No git, nothing to do
    }

    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(&hooks_dir)?;

    let hook_path = hooks_dir.join("pre-commit");
    let final_content = if hook_path.exists() {
        let existing = fs::read_to_string(&hook_path)?;
        if existing.contains(BLOCK_START) {
            return Ok(());
        }
        format!("{}\n\n{}\n", existing.trim_end(), managed_block())
    } else {
        format!("#!/bin/sh\n{}\n", managed_block())
    };

    fs::write(&hook_path, &final_content)?;

    // Make executable
    let mut perms = fs::metadata(&hook_path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&hook_path, perms)?;

    info!("Installed pre-commit hook");
    Ok(())
}

/// Uninstall the tally hook, keeping unrelated hook content.
pub fn uninstall_hook(project_root: &Path) -> Result<bool, Error> {
    let hook_path = project_root.join(".git").join("hooks").join("pre-commit");
    if !hook_path.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(&hook_path)?;
    let (Some(start), Some(end)) = (content.find(BLOCK_START), content.find(BLOCK_END)) else {
        return Ok(false);
    };
    if end < start {
        return Err(Error::Config(
            "pre-commit hook markers are in wrong order".to_string(),
        ));
    }

    let before = &content[..start];
    let after = &content[end + BLOCK_END.len()..];
    let cleaned = format!("{}{}", before.trim_end(), after.trim_end());

    if cleaned.trim().is_empty() || cleaned.trim() == "#!/bin/sh" {
        fs::remove_file(&hook_path)?;
    } else {
        fs::write(&hook_path, format!("{}\n", cleaned.trim_end()))?;
    }

    info!("Removed pre-commit hook");
    Ok(true)
}

/// Run the hooks command.
pub fn run(action: &str) -> Result<(), Error> {
    let root = crate::cli::find_project_root(&std::env::current_dir()?);

    match action {
        "install" => {
            if !has_git(&root) {
                println!("No .git directory found; nothing to install.");
                return Ok(());
            }
            if hook_installed(&root) {
                println!("Pre-commit hook already installed.");
                return Ok(());
            }
            install_hook(&root)?;
            println!("Pre-commit hook installed.");
        }

        "uninstall" => {
            if uninstall_hook(&root)? {
                println!("Pre-commit hook removed.");
            } else {
                println!("No tally hook installed.");
            }
        }

        _ => {
            println!("Unknown action: {}", action);
            println!("Usage: tally hooks [install|uninstall]");
        }
    }

    Ok(())
}
