//! Plugin enable/disable lifecycle.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, PluginError, Result};
use crate::membership::{read_config_or_default, MembershipStore};
use crate::planner::{Plan, PlanExecutor, PlanReport};

use super::info::{plugin_key, PluginInfo};
use super::plugin::Plugin;

/// Runs plugin lifecycles and keeps their state in the membership store.
///
/// The stored record is the only source of truth for whether a plugin is
/// enabled; nothing is cached between calls.
pub struct PluginManager {
    store: Arc<dyn MembershipStore>,
    executor: PlanExecutor,
}

impl PluginManager {
    /// Creates a manager over a membership store.
    #[must_use]
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self {
            store,
            executor: PlanExecutor::new(),
        }
    }

    /// Reads the stored state of a plugin.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is unusable.
    pub async fn plugin_info(&self, name: &str) -> Result<PluginInfo> {
        let config = read_config_or_default(self.store.as_ref(), &plugin_key(name)).await?;
        PluginInfo::from_config(config)
    }

    /// Returns true if the plugin is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record is unusable.
    pub async fn is_enabled(&self, name: &str) -> Result<bool> {
        Ok(self.plugin_info(name).await?.enabled)
    }

    /// Checks every requirement of a plugin against the stored state.
    ///
    /// # Errors
    ///
    /// Returns `MissingRequirement` for the first mandatory requirement
    /// that is not enabled.
    pub async fn check_requirements(&self, plugin: &dyn Plugin) -> Result<()> {
        for requirement in plugin.requires() {
            if self.is_enabled(&requirement.name).await? {
                debug!("{} requirement {} is enabled", plugin.name(), requirement.name);
                continue;
            }

            if requirement.optional {
                warn!(
                    "Optional requirement {} of {} is not enabled, ignoring",
                    requirement.name,
                    plugin.name()
                );
            } else {
                return Err(PluginError::MissingRequirement {
                    plugin: plugin.name().to_string(),
                    requirement: requirement.name,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Enables a plugin: requirements, pre-hook, plan, post-hook, then
    /// the stored flag.
    ///
    /// # Errors
    ///
    /// Returns an error if a requirement is missing, a hook fails or a
    /// plan step fails. Nothing is stored in those cases.
    pub async fn enable(&self, plugin: &dyn Plugin) -> Result<PlanReport> {
        self.check_requirements(plugin).await?;

        info!("Enabling plugin {}", plugin.name());
        plugin.pre_enable().await.map_err(|e| hook_failed(plugin, "pre_enable", e))?;
        let report = self.run(plugin, plugin.enable_plan()).await?;
        plugin.post_enable().await.map_err(|e| hook_failed(plugin, "post_enable", e))?;

        self.persist(plugin, true).await?;
        Ok(report)
    }

    /// Disables a plugin, mirroring [`PluginManager::enable`].
    ///
    /// # Errors
    ///
    /// Returns an error if a hook fails or a plan step fails. Nothing is
    /// stored in those cases.
    pub async fn disable(&self, plugin: &dyn Plugin) -> Result<PlanReport> {
        info!("Disabling plugin {}", plugin.name());
        plugin.pre_disable().await.map_err(|e| hook_failed(plugin, "pre_disable", e))?;
        let report = self.run(plugin, plugin.disable_plan()).await?;
        plugin.post_disable().await.map_err(|e| hook_failed(plugin, "post_disable", e))?;

        self.persist(plugin, false).await?;
        Ok(report)
    }

    async fn run(&self, plugin: &dyn Plugin, plan: Plan) -> Result<PlanReport> {
        let report = self.executor.execute(plan).await;
        debug!("{report}");
        if report.succeeded() {
            Ok(report)
        } else {
            Err(PluginError::PlanFailed {
                plugin: plugin.name().to_string(),
                message: report.outcome.message().unwrap_or_default().to_string(),
            }
            .into())
        }
    }

    async fn persist(&self, plugin: &dyn Plugin, enabled: bool) -> Result<()> {
        let key = plugin_key(plugin.name());
        let mut config = read_config_or_default(self.store.as_ref(), &key).await?;

        PluginInfo {
            enabled,
            version: Some(plugin.version().to_string()),
            updated_at: Some(Utc::now()),
            ..PluginInfo::default()
        }
        .merge_into(&mut config);

        self.store.update_config(&key, &config).await?;
        info!("Plugin {} is now {}", plugin.name(), if enabled { "enabled" } else { "disabled" });
        Ok(())
    }
}

fn hook_failed(plugin: &dyn Plugin, hook: &str, err: OrchestratorError) -> OrchestratorError {
    PluginError::HookFailed {
        plugin: plugin.name().to_string(),
        hook: hook.to_string(),
        message: err.to_string(),
    }
    .into()
}
