//! Collaborator doubles and fixtures shared by unit tests.

use async_trait::async_trait;
use mockall::mock;
use std::time::Duration;

use crate::controller::{Application, DeploymentController, ModelStatus, Unit};
use crate::error::Result;
use crate::infra::{InfraTool, Variables};
use crate::membership::{ClusterNode, ConfigMap, MembershipStore};

mock! {
    pub Controller {}

    #[async_trait]
    impl DeploymentController for Controller {
        async fn get_application(&self, model: &str, name: &str) -> Result<Application>;
        async fn add_unit(&self, model: &str, name: &str, machine_id: &str) -> Result<Unit>;
        async fn remove_unit(&self, model: &str, name: &str, unit_name: &str) -> Result<()>;
        async fn wait_until_desired_status(
            &self,
            model: &str,
            names: &[String],
            statuses: &[String],
            timeout: Duration,
        ) -> Result<()>;
        async fn wait_application_ready(
            &self,
            model: &str,
            name: &str,
            timeout: Duration,
        ) -> Result<()>;
        async fn get_available_charm_revision(
            &self,
            model: &str,
            charm: &str,
            channel: &str,
        ) -> Result<u64>;
        async fn get_model_status(&self, model: &str) -> Result<ModelStatus>;
    }
}

mock! {
    pub Infra {}

    #[async_trait]
    impl InfraTool for Infra {
        async fn init(&self, config_id: &str) -> Result<()>;
        async fn apply(&self, config_id: &str, overrides: &Variables) -> Result<()>;
    }
}

mock! {
    pub Store {}

    #[async_trait]
    impl MembershipStore for Store {
        async fn list_nodes(&self) -> Result<Vec<ClusterNode>>;
        async fn read_config(&self, key: &str) -> Result<ConfigMap>;
        async fn update_config(&self, key: &str, value: &ConfigMap) -> Result<()>;
    }
}

/// An application with one unit on each of the given machines.
pub fn application_on_machines(name: &str, machine_ids: &[&str]) -> Application {
    Application {
        name: name.to_string(),
        units: machine_ids
            .iter()
            .enumerate()
            .map(|(i, id)| Unit::new(format!("{name}/{i}"), *id))
            .collect(),
    }
}

/// A cluster node.
pub fn node(name: &str, machine_id: &str) -> ClusterNode {
    ClusterNode {
        name: name.to_string(),
        machine_id: machine_id.to_string(),
    }
}
