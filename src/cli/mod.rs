//! CLI module for the Switchcloud reconciler.
//!
//! This module provides the command-line interface for managing
//! Switchcloud projects and their members.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
