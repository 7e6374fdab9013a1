//! Deployment of a machine application.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::DeploymentController;
use crate::infra::{InfraTool, Variables};
use crate::planner::{RetryPolicy, Step, StepResult};

use super::{DEFAULT_STEP_TIMEOUT, MACHINE_IDS_VAR, MACHINE_MODEL_VAR};

/// Deploys (or redeploys) an application through the infra tool.
pub struct DeployMachineApplicationStep {
    controller: Arc<dyn DeploymentController>,
    infra: Arc<dyn InfraTool>,
    config_key: String,
    application: String,
    model: String,
    refresh: bool,
    readiness_check: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    name: String,
}

impl DeployMachineApplicationStep {
    /// Creates a new deploy step.
    #[must_use]
    pub fn new(
        controller: Arc<dyn DeploymentController>,
        infra: Arc<dyn InfraTool>,
        config_key: impl Into<String>,
        application: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let application = application.into();
        Self {
            name: format!("Deploy {application}"),
            controller,
            infra,
            config_key: config_key.into(),
            application,
            model: model.into(),
            refresh: false,
            readiness_check: None,
            timeout: DEFAULT_STEP_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Forces a redeploy even if the application exists.
    #[must_use]
    pub const fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Waits for the application to be ready after applying.
    #[must_use]
    pub fn with_readiness_check(mut self, name: impl Into<String>) -> Self {
        self.readiness_check = Some(name.into());
        self
    }

    /// Sets the readiness timeout.
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

    /// Overrides placing the application on the machines it already runs on.
    async fn placement_overrides(&self) -> crate::error::Result<Variables> {
        let mut overrides = Variables::new();
        match self.controller.get_application(&self.model, &self.application).await {
            Ok(app) => {
                let machine_ids = app.machine_ids();
                debug!("{} runs on machines {machine_ids:?}", self.application);
                overrides.insert(
                    MACHINE_IDS_VAR.to_string(),
                    Value::Array(machine_ids.into_iter().map(Value::String).collect()),
                );
                overrides.insert(MACHINE_MODEL_VAR.to_string(), Value::String(self.model.clone()));
            }
            Err(e) if e.is_application_not_found() => {
                debug!("{} not deployed yet, initial placement", self.application);
            }
            Err(e) => return Err(e),
        }
        Ok(overrides)
    }
}

#[async_trait]
impl Step for DeployMachineApplicationStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Deploying machine application"
    }

    async fn is_skip(&mut self) -> StepResult {
        if self.refresh {
            return StepResult::completed();
        }

        match self.controller.get_application(&self.model, &self.application).await {
            Ok(_) => StepResult::skipped(format!("{} already deployed", self.application)),
            Err(e) if e.is_application_not_found() => StepResult::completed(),
            Err(e) => StepResult::failed(e.to_string()),
        }
    }

    async fn run(&mut self) -> StepResult {
        let overrides = match self.placement_overrides().await {
            Ok(overrides) => overrides,
            Err(e) => return StepResult::failed(e.to_string()),
        };

        info!("Deploying {} to model {}", self.application, self.model);
        let infra = self.infra.as_ref();
        let config_key = self.config_key.as_str();
        let overrides = &overrides;
        if let Err(e) = self
            .retry
            .retry(&self.name, move || infra.apply(config_key, overrides))
            .await
        {
            warn!("Error deploying {}: {e}", self.application);
            return StepResult::failed(e.to_string());
        }

        if let Some(check) = &self.readiness_check {
            debug!("Waiting for {check} to be ready");
            if let Err(e) = self
                .controller
                .wait_application_ready(&self.model, check, self.timeout)
                .await
            {
                warn!("{e}");
                return StepResult::failed(e.to_string());
            }
        }

        StepResult::completed()
    }
}
