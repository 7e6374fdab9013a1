//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{OrchestratorConfig, ValidationResult};
use crate::controller::CharmRef;
use crate::membership::ClusterNode;
use crate::plugins::PluginInfo;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Node row for table display.
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Machine")]
    machine_id: String,
}

/// Plugin row for table display.
#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Plugin")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

#[derive(Serialize)]
struct PluginJson<'a> {
    name: &'a str,
    #[serde(flatten)]
    info: &'a PluginInfo,
}

#[derive(Serialize)]
struct ChannelJson<'a> {
    deployed: &'a str,
    target: &'a str,
    update_needed: bool,
}

#[derive(Serialize)]
struct ValidationJson<'a> {
    valid: bool,
    warnings: &'a [String],
    config: &'a OrchestratorConfig,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats cluster nodes.
    #[must_use]
    pub fn format_nodes(&self, nodes: &[ClusterNode]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&nodes),
            OutputFormat::Text => {
                if nodes.is_empty() {
                    return String::from("No nodes registered.\n");
                }
                let rows = nodes.iter().map(|n| NodeRow {
                    name: n.name.clone(),
                    machine_id: n.machine_id.clone(),
                });
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats stored plugin states.
    #[must_use]
    pub fn format_plugins(&self, plugins: &[(String, PluginInfo)]) -> String {
        match self.format {
            OutputFormat::Json => {
                let items: Vec<PluginJson<'_>> = plugins
                    .iter()
                    .map(|(name, info)| PluginJson { name, info })
                    .collect();
                to_json(&items)
            }
            OutputFormat::Text => {
                let rows = plugins.iter().map(|(name, info)| PluginRow {
                    name: name.clone(),
                    enabled: if info.enabled {
                        "yes".green().to_string()
                    } else {
                        "no".dimmed().to_string()
                    },
                    version: info.version.clone().unwrap_or_else(|| String::from("-")),
                    updated_at: info
                        .updated_at
                        .map_or_else(
                            || String::from("-"),
                            |t| t.format("%Y-%m-%d %H:%M").to_string(),
                        ),
                });
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats a channel comparison.
    #[must_use]
    pub fn format_channel_check(
        &self,
        deployed: &str,
        target: &str,
        update_needed: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&ChannelJson {
                deployed,
                target,
                update_needed,
            }),
            OutputFormat::Text if update_needed => {
                format!("{} {deployed} -> {target} is an update\n", "↑".green())
            }
            OutputFormat::Text => {
                format!("{} {deployed} -> {target} needs no update\n", "=".yellow())
            }
        }
    }

    /// Formats a parsed charm URL.
    #[must_use]
    pub fn format_charm(&self, charm: &CharmRef) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "name": charm.name,
                "revision": charm.revision,
            })),
            OutputFormat::Text => {
                let revision = charm
                    .revision
                    .map_or_else(|| String::from("none"), |r| r.to_string());
                format!("Charm: {}\nRevision: {revision}\n", charm.name.bold())
            }
        }
    }

    /// Formats a validation outcome.
    #[must_use]
    pub fn format_validation(
        &self,
        result: &ValidationResult,
        config: &OrchestratorConfig,
        show_warnings: bool,
    ) -> String {
        if self.format == OutputFormat::Json {
            return to_json(&ValidationJson {
                valid: result.is_valid(),
                warnings: &result.warnings,
                config,
            });
        }

        let mut output = format!("{} Configuration is valid\n", "✓".green());
        if show_warnings && !result.warnings.is_empty() {
            output.push_str("\nWarnings:\n");
            for warning in &result.warnings {
                let _ = writeln!(output, "  {} {warning}", "!".yellow());
            }
        }

        let _ = write!(
            output,
            "\nStore: {}\nTimeouts: deploy {}s, unit {}s, upgrade {}s\n\
             Retry: {} attempts, {}s pause\n",
            config.store.resolved_path().display(),
            config.timeouts.deploy_secs,
            config.timeouts.unit_secs,
            config.timeouts.upgrade_secs,
            config.retry.max_attempts,
            config.retry.pause_secs,
        );
        output
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
