//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Switchcloud - Declarative project and membership manager.
#[derive(Parser, Debug)]
#[command(name = "switchcloud")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest file.
    #[arg(short, long, global = true, env = "SWITCHCLOUD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the manifest without contacting the API.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show the changes an apply would make.
    Plan {
        /// Show per-attribute changes.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Apply the manifest.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Continue with independent actions after a failure.
        #[arg(long)]
        continue_on_error: bool,

        /// Create replacements before deleting the objects they replace.
        #[arg(long)]
        create_before_destroy: bool,
    },

    /// Re-read every recorded object from the API.
    Refresh,

    /// Adopt an existing remote object into state.
    Import {
        /// State address, e.g. `project.platform` or `project_member.alice`.
        address: String,

        /// Remote identifier: `<id>` for projects, `<project_id>/<id>` for members.
        id: String,
    },

    /// Delete every recorded object.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Look up an existing project by name.
    Lookup {
        /// Project name.
        #[arg(long)]
        name: String,
    },

    /// Manage local state.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show current state.
    Show,

    /// Lock the state.
    Lock {
        /// Lock holder identifier.
        #[arg(long)]
        holder: Option<String>,
    },

    /// Unlock the state.
    Unlock {
        /// Lock ID to unlock.
        #[arg(long)]
        lock_id: Option<String>,

        /// Force unlock (dangerous).
        #[arg(long)]
        force: bool,
    },

    /// Forget a recorded object without touching the API.
    Rm {
        /// State address to forget.
        address: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply_flags() {
        let cli = Cli::try_parse_from([
            "switchcloud",
            "--output",
            "json",
            "apply",
            "--yes",
            "--create-before-destroy",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Apply {
                yes: true,
                continue_on_error: false,
                create_before_destroy: true,
            }
        ));
    }

    #[test]
    fn test_parse_import() {
        let cli =
            Cli::try_parse_from(["switchcloud", "import", "project_member.alice", "p1/m1"]).unwrap();
        match cli.command {
            Commands::Import { address, id } => {
                assert_eq!(address, "project_member.alice");
                assert_eq!(id, "p1/m1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_state_rm_requires_address() {
        assert!(Cli::try_parse_from(["switchcloud", "state", "rm"]).is_err());
    }
}
