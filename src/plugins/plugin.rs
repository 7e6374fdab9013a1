//! Plugin contract and the stock infra-toggling plugin.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::controller::DeploymentController;
use crate::error::Result;
use crate::infra::{InfraApplyStep, InfraTool, Variables};
use crate::planner::{Plan, RetryPolicy};

/// Another plugin that must be enabled first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRequirement {
    /// Name of the required plugin.
    pub name: String,
    /// Whether the plugin still works without it.
    pub optional: bool,
}

impl PluginRequirement {
    /// A mandatory requirement.
    #[must_use]
    pub fn mandatory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// An optional requirement.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// A feature that can be enabled and disabled on a running cluster.
///
/// Hooks default to doing nothing. The plans are built fresh for each
/// enable or disable and run by the plugin manager.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name, unique within the cluster.
    fn name(&self) -> &str;

    /// Plugin version recorded on every state change.
    fn version(&self) -> &str;

    /// Plugins this one depends on.
    fn requires(&self) -> Vec<PluginRequirement> {
        Vec::new()
    }

    /// Runs before the enable plan.
    async fn pre_enable(&self) -> Result<()> {
        Ok(())
    }

    /// Steps enabling the feature.
    fn enable_plan(&self) -> Plan;

    /// Runs after a successful enable plan.
    async fn post_enable(&self) -> Result<()> {
        Ok(())
    }

    /// Runs before the disable plan.
    async fn pre_disable(&self) -> Result<()> {
        Ok(())
    }

    /// Steps disabling the feature.
    fn disable_plan(&self) -> Plan;

    /// Runs after a successful disable plan.
    async fn post_disable(&self) -> Result<()> {
        Ok(())
    }
}

/// Plugin toggling a set of variables on one infra configuration.
pub struct FeaturePlugin {
    name: String,
    version: String,
    requires: Vec<PluginRequirement>,
    infra: Arc<dyn InfraTool>,
    config_id: String,
    enable_vars: Variables,
    disable_vars: Variables,
    retry: RetryPolicy,
    wait: Option<FeatureWait>,
}

struct FeatureWait {
    controller: Arc<dyn DeploymentController>,
    model: String,
    applications: Vec<String>,
    timeout: Duration,
}

impl FeaturePlugin {
    /// Creates a plugin applying `enable_vars` / `disable_vars` to `config_id`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        infra: Arc<dyn InfraTool>,
        config_id: impl Into<String>,
        enable_vars: Variables,
        disable_vars: Variables,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            requires: Vec::new(),
            infra,
            config_id: config_id.into(),
            enable_vars,
            disable_vars,
            retry: RetryPolicy::default(),
            wait: None,
        }
    }

    /// Adds a requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: PluginRequirement) -> Self {
        self.requires.push(requirement);
        self
    }

    /// Sets the retry policy of the apply steps.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Waits for `applications` to be active after enabling.
    #[must_use]
    pub fn wait_for(
        mut self,
        controller: Arc<dyn DeploymentController>,
        model: impl Into<String>,
        applications: Vec<String>,
        timeout: Duration,
    ) -> Self {
        self.wait = Some(FeatureWait {
            controller,
            model: model.into(),
            applications,
            timeout,
        });
        self
    }

    fn apply_step(&self, verb: &str, vars: &Variables) -> InfraApplyStep {
        InfraApplyStep::new(Arc::clone(&self.infra), self.config_id.clone(), vars.clone())
            .with_name(format!("{verb} {}", self.name))
            .with_retry(self.retry.clone())
    }
}

#[async_trait]
impl Plugin for FeaturePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn requires(&self) -> Vec<PluginRequirement> {
        self.requires.clone()
    }

    fn enable_plan(&self) -> Plan {
        let mut step = self.apply_step("Enable", &self.enable_vars);
        if let Some(wait) = &self.wait {
            step = step.wait_for(
                Arc::clone(&wait.controller),
                wait.model.clone(),
                wait.applications.clone(),
                &["active"],
                wait.timeout,
            );
        }
        vec![Box::new(step)]
    }

    fn disable_plan(&self) -> Plan {
        vec![Box::new(self.apply_step("Disable", &self.disable_vars))]
    }
}
