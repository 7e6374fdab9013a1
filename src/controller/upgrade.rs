//! Channel/revision driven application refresh.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::infra::{InfraTool, Variables};
use crate::planner::{RetryPolicy, Step, StepResult};

use super::channel::{channel_update_needed, revision_update_needed};
use super::client::DeploymentController;

/// Workload statuses accepted after a refresh.
pub const UPGRADE_ACCEPTED_STATUSES: &[&str] = &["active", "blocked", "unknown"];

/// Default wait for upgraded applications.
pub const DEFAULT_UPGRADE_TIMEOUT: Duration = Duration::from_secs(1200);

/// Desired channel for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCharm {
    /// Application name in the model.
    pub application: String,
    /// Channel the application should track.
    pub channel: String,
    /// Infra variable carrying the channel for this application.
    pub channel_variable: String,
}

/// Refreshes applications whose channel or revision is behind.
pub struct UpgradeApplicationsStep {
    controller: Arc<dyn DeploymentController>,
    infra: Arc<dyn InfraTool>,
    config_key: String,
    model: String,
    targets: Vec<TargetCharm>,
    timeout: Duration,
    retry: RetryPolicy,
    pending: Vec<TargetCharm>,
}

impl UpgradeApplicationsStep {
    /// Creates a new upgrade step.
    #[must_use]
    pub fn new(
        controller: Arc<dyn DeploymentController>,
        infra: Arc<dyn InfraTool>,
        config_key: impl Into<String>,
        model: impl Into<String>,
        targets: Vec<TargetCharm>,
    ) -> Self {
        Self {
            controller,
            infra,
            config_key: config_key.into(),
            model: model.into(),
            targets,
            timeout: DEFAULT_UPGRADE_TIMEOUT,
            retry: RetryPolicy::default(),
            pending: Vec::new(),
        }
    }

    /// Sets the convergence timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy around the apply.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Collects the targets that are behind the model's current state.
    async fn outdated_targets(&self) -> crate::error::Result<Vec<TargetCharm>> {
        let status = self.controller.get_model_status(&self.model).await?;
        let mut outdated = Vec::new();

        for target in &self.targets {
            let Some(app_status) = status.applications.get(&target.application) else {
                debug!("{} is not deployed in {}, ignoring", target.application, self.model);
                continue;
            };
            let deployed = app_status.charm_channel.as_deref().unwrap_or_default();

            if channel_update_needed(deployed, &target.channel)
                || revision_update_needed(
                    self.controller.as_ref(),
                    &target.application,
                    &self.model,
                    &status,
                )
                .await?
            {
                outdated.push(target.clone());
            }
        }

        Ok(outdated)
    }
}

#[async_trait]
impl Step for UpgradeApplicationsStep {
    fn name(&self) -> &str {
        "Upgrade applications"
    }

    fn description(&self) -> &str {
        "Refreshing applications to their target channels"
    }

    async fn is_skip(&mut self) -> StepResult {
        match self.outdated_targets().await {
            Ok(outdated) if outdated.is_empty() => {
                StepResult::skipped("All applications are up to date")
            }
            Ok(outdated) => {
                info!(
                    "{} of {} applications need a refresh",
                    outdated.len(),
                    self.targets.len()
                );
                self.pending = outdated;
                StepResult::completed()
            }
            Err(e) => StepResult::failed(e.to_string()),
        }
    }

    async fn run(&mut self) -> StepResult {
        if self.pending.is_empty() {
            self.pending = self.targets.clone();
        }

        let overrides: Variables = self
            .pending
            .iter()
            .map(|t| (t.channel_variable.clone(), Value::String(t.channel.clone())))
            .collect();

        let infra = self.infra.as_ref();
        let config_key = self.config_key.as_str();
        let overrides = &overrides;
        if let Err(e) = self
            .retry
            .retry("apply", move || infra.apply(config_key, overrides))
            .await
        {
            warn!("Error upgrading applications: {e}");
            return StepResult::failed(e.to_string());
        }

        let names: Vec<String> = self.pending.iter().map(|t| t.application.clone()).collect();
        let statuses: Vec<String> =
            UPGRADE_ACCEPTED_STATUSES.iter().map(|s| (*s).to_string()).collect();
        if let Err(e) = self
            .controller
            .wait_until_desired_status(&self.model, &names, &statuses, self.timeout)
            .await
        {
            warn!("{e}");
            return StepResult::failed(e.to_string());
        }

        StepResult::completed_with(serde_json::json!({ "upgraded": names }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::client::{ApplicationStatus, ModelStatus};
    use crate::error::{ControllerError, InfraError};
    use crate::testing::{MockController, MockInfra};
    use std::collections::BTreeMap;

    fn status(channel: &str, charm: &str) -> ModelStatus {
        ModelStatus {
            applications: BTreeMap::from([(
                String::from("nova"),
                ApplicationStatus {
                    charm: charm.to_string(),
                    charm_channel: Some(channel.to_string()),
                },
            )]),
        }
    }

    fn target(channel: &str) -> TargetCharm {
        TargetCharm {
            application: String::from("nova"),
            channel: channel.to_string(),
            channel_variable: String::from("nova-channel"),
        }
    }

    fn step(
        controller: MockController,
        infra: MockInfra,
        channel: &str,
    ) -> UpgradeApplicationsStep {
        UpgradeApplicationsStep::new(
            Arc::new(controller),
            Arc::new(infra),
            "TerraformVarsOpenstack",
            "openstack",
            vec![target(channel)],
        )
        .with_retry(RetryPolicy::state_lock(3, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_is_skip_when_up_to_date() {
        let mut controller = MockController::new();
        controller
            .expect_get_model_status()
            .times(1)
            .returning(|_| Ok(status("2023.2/stable", "ch:amd64/jammy/nova-k8s-30")));
        controller
            .expect_get_available_charm_revision()
            .returning(|_, _, _| Ok(30));

        let mut step = step(controller, MockInfra::new(), "2023.2/stable");
        assert!(step.is_skip().await.is_skipped());
    }

    #[tokio::test]
    async fn test_channel_change_triggers_refresh() {
        let mut controller = MockController::new();
        controller
            .expect_get_model_status()
            .returning(|_| Ok(status("2023.1/stable", "ch:amd64/jammy/nova-k8s-30")));
        controller
            .expect_get_available_charm_revision()
            .returning(|_, _, _| Ok(30));
        controller
            .expect_wait_until_desired_status()
            .withf(|model, names, statuses, _| {
                model == "openstack" && names == ["nova"] && statuses.len() == 3
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut infra = MockInfra::new();
        infra
            .expect_apply()
            .withf(|config, vars| {
                config == "TerraformVarsOpenstack" && vars["nova-channel"] == "2023.2/stable"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut step = step(controller, infra, "2023.2/stable");
        assert!(step.is_skip().await.is_completed());
        assert!(step.run().await.is_completed());
    }

    #[tokio::test]
    async fn test_run_apply_failure_is_reported() {
        let mut infra = MockInfra::new();
        infra
            .expect_apply()
            .times(1)
            .returning(|_, _| Err(InfraError::apply("apply failed...").into()));

        let mut step = step(MockController::new(), infra, "2023.2/stable");
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("apply failed..."));
    }

    #[tokio::test]
    async fn test_run_wait_timeout_is_reported() {
        let mut controller = MockController::new();
        controller
            .expect_wait_until_desired_status()
            .returning(|_, _, _, _| Err(ControllerError::timeout("timed out").into()));
        let mut infra = MockInfra::new();
        infra.expect_apply().returning(|_, _| Ok(()));

        let mut step = step(controller, infra, "2023.2/stable");
        let result = step.run().await;
        assert_eq!(result.message(), Some("timed out"));
    }
}
