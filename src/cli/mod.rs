//! CLI module for the `fleet` tool.
//!
//! Read-only inspection of configuration, membership and plugin state,
//! plus the channel comparator, from the command line.

mod commands;
mod output;

pub use commands::{Cli, Commands, NodeCommands, OutputFormat};
pub use output::OutputFormatter;
