//! CLI commands for tally.

pub mod check;
pub mod hooks;
pub mod init;
pub mod rules;

use std::path::{Path, PathBuf};

/// Nearest ancestor directory containing `.tally/`, else `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    let mut current = start;
    loop {
        if current.join(".tally").is_dir() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start.to_path_buf(),
        }
    }
}
