//! Adding and removing single application units on cluster machines.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::{DeploymentController, MachineUnit};
use crate::error::{ErrorKind, Result};
use crate::membership::{find_node, read_config_or_default, MembershipStore};
use crate::planner::{Step, StepResult};

use super::{DEFAULT_STEP_TIMEOUT, MACHINE_IDS_VAR};

/// Change to the persisted machine list of an application.
#[derive(Debug, Clone, Copy)]
enum Membership {
    Join,
    Leave,
}

/// Records a machine joining or leaving the persisted `machine_ids` list
/// stored under `config_key`.
async fn update_machine_ids(
    store: &dyn MembershipStore,
    config_key: &str,
    machine_id: &str,
    change: Membership,
) -> Result<()> {
    let mut config = read_config_or_default(store, config_key).await?;

    let mut machine_ids: Vec<String> = config
        .get(MACHINE_IDS_VAR)
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    match change {
        Membership::Join if !machine_ids.iter().any(|id| id == machine_id) => {
            machine_ids.push(machine_id.to_string());
        }
        Membership::Join => {}
        Membership::Leave => machine_ids.retain(|id| id != machine_id),
    }

    debug!("{config_key}: {MACHINE_IDS_VAR} = {machine_ids:?}");
    config.insert(
        MACHINE_IDS_VAR.to_string(),
        Value::Array(machine_ids.into_iter().map(Value::String).collect()),
    );
    store.update_config(config_key, &config).await
}

fn missing_machine(name: &str) -> String {
    format!("machine {name} does not exist in cluster database")
}

/// Adds a unit of an application on one named cluster machine.
pub struct AddMachineUnitsStep {
    store: Arc<dyn MembershipStore>,
    controller: Arc<dyn DeploymentController>,
    node_name: String,
    config_key: String,
    application: String,
    model: String,
    timeout: Duration,
    machine_id: Option<String>,
    name: String,
}

impl AddMachineUnitsStep {
    /// Creates a new add-unit step.
    #[must_use]
    pub fn new(
        store: Arc<dyn MembershipStore>,
        node_name: impl Into<String>,
        controller: Arc<dyn DeploymentController>,
        config_key: impl Into<String>,
        application: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let application = application.into();
        Self {
            name: format!("Add {application} unit"),
            store,
            controller,
            node_name: node_name.into(),
            config_key: config_key.into(),
            application,
            model: model.into(),
            timeout: DEFAULT_STEP_TIMEOUT,
            machine_id: None,
        }
    }

    /// Sets the unit readiness timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn resolve_machine(&mut self) -> std::result::Result<String, StepResult> {
        if let Some(id) = &self.machine_id {
            return Ok(id.clone());
        }

        match find_node(self.store.as_ref(), &self.node_name).await {
            Ok(node) => {
                self.machine_id = Some(node.machine_id.clone());
                Ok(node.machine_id)
            }
            Err(e) if e.kind() == ErrorKind::NodeNotFound => {
                Err(StepResult::failed(missing_machine(&self.node_name)))
            }
            Err(e) => Err(StepResult::failed(e.to_string())),
        }
    }
}

#[async_trait]
impl Step for AddMachineUnitsStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Adding application unit to machine"
    }

    async fn is_skip(&mut self) -> StepResult {
        let machine_id = match self.resolve_machine().await {
            Ok(id) => id,
            Err(failed) => return failed,
        };

        match self.controller.get_application(&self.model, &self.application).await {
            Ok(app) if app.unit_on_machine(&machine_id).is_some() => StepResult::skipped(format!(
                "{} unit already deployed on machine {machine_id}",
                self.application
            )),
            Ok(_) => StepResult::completed(),
            Err(e) if e.is_application_not_found() => StepResult::completed(),
            Err(e) => StepResult::failed(e.to_string()),
        }
    }

    async fn run(&mut self) -> StepResult {
        let machine_id = match self.resolve_machine().await {
            Ok(id) => id,
            Err(failed) => return failed,
        };

        info!("Adding {} unit on machine {machine_id}", self.application);
        let unit = match self
            .controller
            .add_unit(&self.model, &self.application, &machine_id)
            .await
        {
            Ok(unit) => unit,
            Err(e) => {
                warn!("{e}");
                return StepResult::failed(e.to_string());
            }
        };
        debug!("Unit {} requested on machine {}", unit.name, unit.machine.id);

        // A re-run skips once the unit exists, so record it before waiting.
        let store = self.store.as_ref();
        if let Err(e) =
            update_machine_ids(store, &self.config_key, &machine_id, Membership::Join).await
        {
            return StepResult::failed(e.to_string());
        }

        let names = [self.application.clone()];
        let statuses = [String::from("active")];
        if let Err(e) = self
            .controller
            .wait_until_desired_status(&self.model, &names, &statuses, self.timeout)
            .await
        {
            warn!("{e}");
            return StepResult::failed(e.to_string());
        }

        StepResult::completed()
    }
}

/// Removes the unit of an application hosted on one named cluster machine.
pub struct RemoveMachineUnitsStep {
    store: Arc<dyn MembershipStore>,
    controller: Arc<dyn DeploymentController>,
    node_name: String,
    config_key: String,
    application: String,
    model: String,
    timeout: Duration,
    placement: Option<MachineUnit>,
    name: String,
}

impl RemoveMachineUnitsStep {
    /// Creates a new remove-unit step.
    #[must_use]
    pub fn new(
        store: Arc<dyn MembershipStore>,
        node_name: impl Into<String>,
        controller: Arc<dyn DeploymentController>,
        config_key: impl Into<String>,
        application: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let application = application.into();
        Self {
            name: format!("Remove {application} unit"),
            store,
            controller,
            node_name: node_name.into(),
            config_key: config_key.into(),
            application,
            model: model.into(),
            timeout: DEFAULT_STEP_TIMEOUT,
            placement: None,
        }
    }

    /// Sets the application readiness timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Step for RemoveMachineUnitsStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Removing application unit from machine"
    }

    async fn is_skip(&mut self) -> StepResult {
        let machine_id = match find_node(self.store.as_ref(), &self.node_name).await {
            Ok(node) => node.machine_id,
            Err(e) if e.kind() == ErrorKind::NodeNotFound => {
                return StepResult::skipped(missing_machine(&self.node_name));
            }
            Err(e) => return StepResult::failed(e.to_string()),
        };

        let app = match self.controller.get_application(&self.model, &self.application).await {
            Ok(app) => app,
            Err(e) if e.is_application_not_found() => {
                return StepResult::skipped(format!(
                    "Application {} has not been deployed",
                    self.application
                ));
            }
            Err(e) => return StepResult::failed(e.to_string()),
        };

        let placement = app
            .machine_units()
            .into_iter()
            .find(|mu| mu.machine_id == machine_id);
        let Some(placement) = placement else {
            return StepResult::skipped(format!(
                "{} unit not deployed on machine {machine_id}",
                self.application
            ));
        };

        debug!("Unit {} hosted on machine {machine_id}", placement.unit_name);
        self.placement = Some(placement);
        StepResult::completed()
    }

    async fn run(&mut self) -> StepResult {
        if let Some(placement) = &self.placement {
            info!("Removing unit {}", placement.unit_name);
            if let Err(e) = self
                .controller
                .remove_unit(&self.model, &self.application, &placement.unit_name)
                .await
            {
                warn!("{e}");
                return StepResult::failed(e.to_string());
            }

            // Recorded before waiting, a re-run skips once the unit is gone.
            let store = self.store.as_ref();
            let machine_id = placement.machine_id.as_str();
            if let Err(e) =
                update_machine_ids(store, &self.config_key, machine_id, Membership::Leave).await
            {
                return StepResult::failed(e.to_string());
            }
        }

        if let Err(e) = self
            .controller
            .wait_application_ready(&self.model, &self.application, self.timeout)
            .await
        {
            warn!("{e}");
            return StepResult::failed(e.to_string());
        }

        StepResult::completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Unit;
    use crate::error::{ControllerError, StoreError};
    use crate::membership::ClusterNode;
    use crate::testing::{application_on_machines, node, MockController, MockStore};
    use serde_json::json;

    fn store_with(nodes: Vec<ClusterNode>) -> MockStore {
        let mut store = MockStore::new();
        store.expect_list_nodes().returning(move || Ok(nodes.clone()));
        store
    }

    fn expect_machine_ids(store: &mut MockStore, existing: Option<Value>, expected: Value) {
        store.expect_read_config().times(1).returning(move |key| match &existing {
            Some(value) => Ok(value.as_object().cloned().unwrap_or_default()),
            None => Err(StoreError::not_found(key).into()),
        });
        store
            .expect_update_config()
            .withf(move |key, config| {
                key == "tfconfig" && config.get(MACHINE_IDS_VAR) == Some(&expected)
            })
            .times(1)
            .returning(|_, _| Ok(()));
    }

    fn add_step(store: MockStore, controller: MockController) -> AddMachineUnitsStep {
        AddMachineUnitsStep::new(
            Arc::new(store),
            "machine1",
            Arc::new(controller),
            "tfconfig",
            "app1",
            "model1",
        )
    }

    fn remove_step(
        store: MockStore,
        controller: MockController,
        node_name: &str,
    ) -> RemoveMachineUnitsStep {
        RemoveMachineUnitsStep::new(
            Arc::new(store),
            node_name,
            Arc::new(controller),
            "tfconfig",
            "app1",
            "model1",
        )
    }

    #[tokio::test]
    async fn test_add_is_skip() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .returning(|_, name| Ok(application_on_machines(name, &["2"])));

        let mut step = add_step(store_with(vec![node("machine1", "1")]), controller);
        assert!(step.is_skip().await.is_completed());
    }

    #[tokio::test]
    async fn test_add_is_skip_node_missing() {
        let mut step = add_step(store_with(Vec::new()), MockController::new());
        let result = step.is_skip().await;

        assert!(result.is_failed());
        assert!(result.message().is_some_and(|m| m.contains("does not exist in cluster database")));
    }

    #[tokio::test]
    async fn test_add_is_skip_application_missing() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .times(1)
            .returning(|_, _| {
                Err(ControllerError::application_not_found("Application missing...").into())
            });

        let mut step = add_step(store_with(vec![node("machine1", "1")]), controller);
        assert!(step.is_skip().await.is_completed());
    }

    #[tokio::test]
    async fn test_add_is_skip_unit_already_deployed() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .times(1)
            .returning(|_, name| Ok(application_on_machines(name, &["1"])));

        let mut step = add_step(store_with(vec![node("machine1", "1")]), controller);
        assert!(step.is_skip().await.is_skipped());
    }

    #[tokio::test]
    async fn test_add_run() {
        let mut store = store_with(vec![node("machine1", "1")]);
        let existing = json!({"machine_ids": ["0"], "other": 1});
        expect_machine_ids(&mut store, Some(existing), json!(["0", "1"]));

        let mut controller = MockController::new();
        controller
            .expect_add_unit()
            .withf(|model, name, machine| model == "model1" && name == "app1" && machine == "1")
            .times(1)
            .returning(|_, name, machine| Ok(Unit::new(format!("{name}/1"), machine)));
        controller
            .expect_wait_until_desired_status()
            .withf(|_, names, statuses, _| names == ["app1"] && statuses == ["active"])
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut step = add_step(store, controller);
        assert!(step.run().await.is_completed());
    }

    #[tokio::test]
    async fn test_add_run_application_not_found() {
        let mut controller = MockController::new();
        controller
            .expect_add_unit()
            .times(1)
            .returning(|_, _, _| {
                Err(ControllerError::application_not_found("Application missing...").into())
            });

        let mut step = add_step(store_with(vec![node("machine1", "1")]), controller);
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("Application missing..."));
    }

    #[tokio::test]
    async fn test_add_run_timeout_records_machine() {
        let mut store = store_with(vec![node("machine1", "1")]);
        expect_machine_ids(&mut store, None, json!(["1"]));

        let mut controller = MockController::new();
        controller
            .expect_add_unit()
            .times(1)
            .returning(|_, name, machine| Ok(Unit::new(format!("{name}/1"), machine)));
        controller
            .expect_wait_until_desired_status()
            .times(1)
            .returning(|_, _, _, _| Err(ControllerError::timeout("timed out").into()));

        let mut step = add_step(store, controller);
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("timed out"));
    }

    #[tokio::test]
    async fn test_add_run_store_failure_skips_wait() {
        let mut store = store_with(vec![node("machine1", "1")]);
        store
            .expect_read_config()
            .times(1)
            .returning(|_| {
                Err(StoreError::Corrupted {
                    message: String::from("bad json"),
                }
                .into())
            });

        let mut controller = MockController::new();
        controller
            .expect_add_unit()
            .times(1)
            .returning(|_, name, machine| Ok(Unit::new(format!("{name}/1"), machine)));
        controller.expect_wait_until_desired_status().times(0);

        let mut step = add_step(store, controller);
        assert!(step.run().await.is_failed());
    }

    #[tokio::test]
    async fn test_remove_is_skip() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .times(1)
            .returning(|_, name| Ok(application_on_machines(name, &["1"])));

        let mut step = remove_step(store_with(vec![node("node-0", "1")]), controller, "node-0");
        assert!(step.is_skip().await.is_completed());
    }

    #[tokio::test]
    async fn test_remove_is_skip_node_missing() {
        let mut controller = MockController::new();
        controller.expect_get_application().times(0);

        let mut step = remove_step(store_with(vec![node("node-0", "1")]), controller, "node-1");
        assert!(step.is_skip().await.is_skipped());
    }

    #[tokio::test]
    async fn test_remove_is_skip_application_missing() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .times(1)
            .returning(|_, _| {
                Err(ControllerError::application_not_found("Application missing...").into())
            });

        let mut step = remove_step(store_with(vec![node("node-0", "1")]), controller, "node-0");
        let result = step.is_skip().await;
        assert!(result.is_skipped());
        assert!(!result.is_failed());
    }

    #[tokio::test]
    async fn test_remove_is_skip_unit_missing() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .times(1)
            .returning(|_, name| Ok(application_on_machines(name, &[])));

        let mut step = remove_step(store_with(vec![node("node-0", "1")]), controller, "node-0");
        assert!(step.is_skip().await.is_skipped());
    }

    #[tokio::test]
    async fn test_remove_run() {
        let mut store = store_with(vec![node("node-0", "1")]);
        expect_machine_ids(&mut store, None, json!([]));

        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .returning(|_, name| Ok(application_on_machines(name, &["1"])));
        controller
            .expect_remove_unit()
            .withf(|_, _, unit| unit == "app1/0")
            .times(1)
            .returning(|_, _, _| Ok(()));
        controller
            .expect_wait_application_ready()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut step = remove_step(store, controller, "node-0");
        assert!(step.is_skip().await.is_completed());
        assert!(step.run().await.is_completed());
    }

    #[tokio::test]
    async fn test_remove_run_application_not_found() {
        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .returning(|_, name| Ok(application_on_machines(name, &["1"])));
        controller
            .expect_remove_unit()
            .times(1)
            .returning(|_, _, _| {
                Err(ControllerError::application_not_found("Application missing...").into())
            });

        let mut step = remove_step(store_with(vec![node("node-0", "1")]), controller, "node-0");
        assert!(step.is_skip().await.is_completed());
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("Application missing..."));
    }

    #[tokio::test]
    async fn test_remove_run_timeout() {
        let mut controller = MockController::new();
        controller
            .expect_wait_application_ready()
            .times(1)
            .returning(|_, _, _| Err(ControllerError::timeout("timed out").into()));

        let mut step = remove_step(MockStore::new(), controller, "node-0");
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("timed out"));
    }

    #[tokio::test]
    async fn test_remove_run_timeout_records_leave() {
        let mut store = store_with(vec![node("node-0", "1")]);
        expect_machine_ids(&mut store, Some(json!({"machine_ids": ["1", "2"]})), json!(["2"]));

        let mut controller = MockController::new();
        controller
            .expect_get_application()
            .returning(|_, name| Ok(application_on_machines(name, &["1"])));
        controller
            .expect_remove_unit()
            .times(1)
            .returning(|_, _, _| Ok(()));
        controller
            .expect_wait_application_ready()
            .times(1)
            .returning(|_, _, _| Err(ControllerError::timeout("timed out").into()));

        let mut step = remove_step(store, controller, "node-0");
        assert!(step.is_skip().await.is_completed());
        let result = step.run().await;
        assert!(result.is_failed());
        assert_eq!(result.message(), Some("timed out"));
    }

    #[tokio::test]
    async fn test_machine_ids_leave_is_idempotent() {
        let mut store = MockStore::new();
        expect_machine_ids(&mut store, Some(json!({"machine_ids": ["2"]})), json!(["2"]));

        let result = update_machine_ids(&store, "tfconfig", "1", Membership::Leave).await;
        tokio_test::assert_ok!(result);
    }
}
