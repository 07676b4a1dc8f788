//! tally - cross-document consistency checker.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tally::cli;
use tally::cli::check::CheckOptions;
use tally::error::{Error, ExitCode};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "tally - keeps declared facts in project docs matching reality")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check documents against canonical facts
    Check {
        /// Ruleset path (default: .tally/rules.toml, then ~/.tally/rules.toml)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Project root (default: nearest ancestor with a .tally directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scaffold a starter ruleset for this project
    Init {
        /// Skip git hook installation
        #[arg(long)]
        no_hooks: bool,
    },

    /// Show or validate the active ruleset
    Rules {
        /// Action: show or lint
        #[arg(default_value = "show")]
        action: String,

        /// Ruleset path override
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Manage the git pre-commit hook
    Hooks {
        /// Action: install or uninstall
        action: String,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tally=warn".parse().unwrap()))
        .init();

    let cli = Cli::parse();

    let result: Result<ExitCode, Error> = match cli.command {
        None => {
            // Show help when no command provided
            use clap::CommandFactory;
            Cli::command().print_help().unwrap();
            println!();
            Ok(ExitCode::Pass)
        }
        Some(Commands::Check { rules, root, json }) => {
            cli::check::run(CheckOptions { rules, root, json })
        }
        Some(Commands::Init { no_hooks }) => cli::init::run(no_hooks).map(|_| ExitCode::Pass),
        Some(Commands::Rules { action, rules }) => cli::rules::run(&action, rules.as_deref()),
        Some(Commands::Hooks { action }) => cli::hooks::run(&action).map(|_| ExitCode::Pass),
    };

    match result {
        Ok(ExitCode::Pass) => {}
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = if e.is_config() {
                ExitCode::ConfigError
            } else {
                ExitCode::Inconsistent
            };
            std::process::exit(code as i32);
        }
    }
}
