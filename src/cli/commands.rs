//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fleet - cluster lifecycle orchestrator.
#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

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
    /// Validate the orchestrator configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Manage cluster members in the membership store.
    Nodes {
        /// Nodes subcommand.
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Show the stored state of plugins.
    Plugins {
        /// Plugin names.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Check whether moving between two channels is an update.
    Channel {
        /// Channel currently deployed, e.g. `2023.1/stable`.
        deployed: String,
        /// Channel to move to.
        target: String,
    },

    /// Parse a charm URL into name and revision.
    Charm {
        /// Charm URL, e.g. `ch:amd64/jammy/cinder-k8s-50`.
        url: String,
    },
}

/// Membership subcommands.
#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// List cluster nodes.
    List,

    /// Register a node.
    Add {
        /// Node name.
        name: String,
        /// Controller machine id.
        machine_id: String,
    },

    /// Remove a node.
    Remove {
        /// Node name.
        name: String,
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

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_command() {
        let cli = Cli::try_parse_from([
            "fleet",
            "--output",
            "json",
            "channel",
            "2023.1/stable",
            "2023.2/stable",
        ])
        .expect("args");
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Channel { ref deployed, ref target }
                if deployed == "2023.1/stable" && target == "2023.2/stable"
        ));
    }

    #[test]
    fn test_plugins_requires_names() {
        assert!(Cli::try_parse_from(["fleet", "plugins"]).is_err());

        let cli =
            Cli::try_parse_from(["fleet", "-v", "nodes", "add", "node-1", "3"]).expect("args");
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Nodes { command: NodeCommands::Add { .. } }));
    }
}
