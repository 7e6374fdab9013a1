//! Infra-as-code tool interface and the generic steps driving it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::DeploymentController;
use crate::error::Result;
use crate::planner::{RetryPolicy, Step, StepResult};

/// Variable overrides passed to an apply.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Declarative infrastructure tool, addressed by configuration id.
#[async_trait]
pub trait InfraTool: Send + Sync {
    /// Initialises the backend of a configuration.
    async fn init(&self, config_id: &str) -> Result<()>;

    /// Applies a configuration with the given variable overrides.
    ///
    /// Fails with `StateLocked` when another writer holds the state lock.
    async fn apply(&self, config_id: &str, overrides: &Variables) -> Result<()>;
}

/// Initialises one infra configuration.
pub struct InfraInitStep {
    infra: Arc<dyn InfraTool>,
    config_id: String,
}

impl InfraInitStep {
    /// Creates a new init step.
    #[must_use]
    pub fn new(infra: Arc<dyn InfraTool>, config_id: impl Into<String>) -> Self {
        Self {
            infra,
            config_id: config_id.into(),
        }
    }
}

#[async_trait]
impl Step for InfraInitStep {
    fn name(&self) -> &str {
        "Initialize infra"
    }

    fn description(&self) -> &str {
        "Initializing infra-as-code backend"
    }

    async fn run(&mut self) -> StepResult {
        match self.infra.init(&self.config_id).await {
            Ok(()) => StepResult::completed(),
            Err(e) => {
                warn!("Error initializing {}: {e}", self.config_id);
                StepResult::failed(e.to_string())
            }
        }
    }
}

/// Applies a fixed override set to one infra configuration.
pub struct InfraApplyStep {
    infra: Arc<dyn InfraTool>,
    config_id: String,
    overrides: Variables,
    retry: RetryPolicy,
    wait: Option<ConvergenceWait>,
    name: String,
}

/// Optional wait after an apply.
struct ConvergenceWait {
    controller: Arc<dyn DeploymentController>,
    model: String,
    applications: Vec<String>,
    statuses: Vec<String>,
    timeout: Duration,
}

impl InfraApplyStep {
    /// Creates a new apply step.
    #[must_use]
    pub fn new(
        infra: Arc<dyn InfraTool>,
        config_id: impl Into<String>,
        overrides: Variables,
    ) -> Self {
        let config_id = config_id.into();
        Self {
            name: format!("Apply {config_id}"),
            infra,
            config_id,
            overrides,
            retry: RetryPolicy::default(),
            wait: None,
        }
    }

    /// Sets the step name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the retry policy around the apply.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Waits for `applications` to reach one of `statuses` after applying.
    #[must_use]
    pub fn wait_for(
        mut self,
        controller: Arc<dyn DeploymentController>,
        model: impl Into<String>,
        applications: Vec<String>,
        statuses: &[&str],
        timeout: Duration,
    ) -> Self {
        self.wait = Some(ConvergenceWait {
            controller,
            model: model.into(),
            applications,
            statuses: statuses.iter().map(|s| (*s).to_string()).collect(),
            timeout,
        });
        self
    }
}

#[async_trait]
impl Step for InfraApplyStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Applying infra-as-code configuration"
    }

    async fn run(&mut self) -> StepResult {
        let infra = self.infra.as_ref();
        let config_id = self.config_id.as_str();
        let overrides = &self.overrides;

        debug!("Applying {config_id} with {} overrides", overrides.len());
        if let Err(e) = self
            .retry
            .retry(config_id, move || infra.apply(config_id, overrides))
            .await
        {
            warn!("Error applying {config_id}: {e}");
            return StepResult::failed(e.to_string());
        }

        if let Some(wait) = &self.wait {
            info!("Waiting for {} to settle", wait.applications.join(", "));
            if let Err(e) = wait
                .controller
                .wait_until_desired_status(
                    &wait.model,
                    &wait.applications,
                    &wait.statuses,
                    wait.timeout,
                )
                .await
            {
                warn!("{e}");
                return StepResult::failed(e.to_string());
            }
        }

        StepResult::completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ControllerError, InfraError};
    use crate::testing::{MockController, MockInfra};
    use serde_json::json;

    #[tokio::test]
    async fn test_init_propagates_message() {
        let mut infra = MockInfra::new();
        infra
            .expect_init()
            .withf(|config| config == "openstack-plan")
            .times(1)
            .returning(|_| Err(InfraError::apply("init failed...").into()));

        let mut step = InfraInitStep::new(Arc::new(infra), "openstack-plan");
        assert!(step.is_skip().await.is_completed());
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("init failed..."));
    }

    #[tokio::test]
    async fn test_apply_retries_lock_contention() {
        let mut infra = MockInfra::new();
        let mut seq = mockall::Sequence::new();
        infra
            .expect_apply()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(InfraError::state_locked("state locked").into()));
        infra
            .expect_apply()
            .withf(|_, vars| vars["enable-ldap"] == true)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let overrides = json!({"enable-ldap": true}).as_object().cloned().unwrap_or_default();
        let mut step = InfraApplyStep::new(Arc::new(infra), "openstack-plan", overrides)
            .with_retry(RetryPolicy::state_lock(3, Duration::ZERO));

        assert!(step.run().await.is_completed());
    }

    #[tokio::test]
    async fn test_apply_does_not_retry_generic_failure() {
        let mut infra = MockInfra::new();
        infra
            .expect_apply()
            .times(1)
            .returning(|_, _| Err(InfraError::apply("apply failed...").into()));

        let mut step = InfraApplyStep::new(Arc::new(infra), "openstack-plan", Variables::new())
            .with_retry(RetryPolicy::state_lock(3, Duration::ZERO));

        assert_eq!(step.run().await.message(), Some("apply failed..."));
    }

    #[tokio::test]
    async fn test_apply_then_wait_timeout() {
        let mut infra = MockInfra::new();
        infra.expect_apply().returning(|_, _| Ok(()));
        let mut controller = MockController::new();
        controller
            .expect_wait_until_desired_status()
            .withf(|model, names, statuses, _| {
                model == "openstack" && names == ["keystone-ldap"] && statuses == ["active"]
            })
            .times(1)
            .returning(|_, _, _, _| Err(ControllerError::timeout("timed out").into()));

        let mut step = InfraApplyStep::new(Arc::new(infra), "openstack-plan", Variables::new())
            .with_retry(RetryPolicy::none())
            .wait_for(
                Arc::new(controller),
                "openstack",
                vec![String::from("keystone-ldap")],
                &["active"],
                Duration::from_secs(1),
            );

        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("timed out"));
    }
}
