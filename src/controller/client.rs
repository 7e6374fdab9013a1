//! Deployment controller interface.
//!
//! The controller's wire protocol is not part of this crate; steps talk to
//! it through [`DeploymentController`], and tests through generated mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::error::Result;

/// Machine hosting a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Controller machine id.
    pub id: String,
}

/// One running instance of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit name, e.g. `microceph/0`.
    pub name: String,
    /// Machine the unit is placed on.
    pub machine: Machine,
}

/// A named, scaled deployment of one charm within a model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Application {
    /// Application name.
    pub name: String,
    /// Current units.
    #[serde(default)]
    pub units: Vec<Unit>,
}

/// Pairing of a machine id with the unit it hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineUnit {
    /// Controller machine id.
    pub machine_id: String,
    /// Unit name.
    pub unit_name: String,
}

/// Status of one application as reported in a model status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    /// Charm URL, e.g. `ch:amd64/jammy/cinder-k8s-50`.
    pub charm: String,
    /// Channel the charm tracks, if any.
    #[serde(rename = "charm-channel", default)]
    pub charm_channel: Option<String>,
}

/// Model status document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    /// Applications by name.
    #[serde(default)]
    pub applications: BTreeMap<String, ApplicationStatus>,
}

/// Client for the model-driven deployment controller.
#[async_trait]
pub trait DeploymentController: Send + Sync {
    /// Fetches an application.
    ///
    /// Fails with `ApplicationNotFound` when the model has no such application.
    async fn get_application(&self, model: &str, name: &str) -> Result<Application>;

    /// Adds a unit of an application on the given machine.
    async fn add_unit(&self, model: &str, name: &str, machine_id: &str) -> Result<Unit>;

    /// Removes a unit from an application.
    async fn remove_unit(&self, model: &str, name: &str, unit_name: &str) -> Result<()>;

    /// Waits until every named application reports one of `statuses`.
    ///
    /// Fails with `Timeout` once `timeout` expires.
    async fn wait_until_desired_status(
        &self,
        model: &str,
        names: &[String],
        statuses: &[String],
        timeout: Duration,
    ) -> Result<()>;

    /// Waits until an application is ready.
    async fn wait_application_ready(&self, model: &str, name: &str, timeout: Duration)
    -> Result<()>;

    /// Returns the latest revision of a charm published on a channel.
    async fn get_available_charm_revision(&self, model: &str, charm: &str, channel: &str)
    -> Result<u64>;

    /// Returns the status document of a model.
    async fn get_model_status(&self, model: &str) -> Result<ModelStatus>;
}

impl Application {
    /// Returns the ids of all machines hosting a unit, sorted and deduplicated.
    #[must_use]
    pub fn machine_ids(&self) -> Vec<String> {
        self.units
            .iter()
            .map(|u| u.machine.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the machine/unit pairs of this application.
    #[must_use]
    pub fn machine_units(&self) -> Vec<MachineUnit> {
        self.units
            .iter()
            .map(|u| MachineUnit {
                machine_id: u.machine.id.clone(),
                unit_name: u.name.clone(),
            })
            .collect()
    }

    /// Returns the unit placed on a machine, if any.
    #[must_use]
    pub fn unit_on_machine(&self, machine_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.machine.id == machine_id)
    }
}

impl Unit {
    /// Creates a unit placed on a machine.
    #[must_use]
    pub fn new(name: impl Into<String>, machine_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            machine: Machine {
                id: machine_id.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_ids_are_unique_and_sorted() {
        let app = Application {
            name: String::from("app1"),
            units: vec![
                Unit::new("app1/1", "2"),
                Unit::new("app1/0", "1"),
                Unit::new("app1/2", "2"),
            ],
        };
        assert_eq!(app.machine_ids(), vec!["1", "2"]);
        assert_eq!(app.unit_on_machine("1").map(|u| u.name.as_str()), Some("app1/0"));
        assert!(app.unit_on_machine("9").is_none());
    }

    #[test]
    fn test_machine_units_keep_every_unit() {
        let app = Application {
            name: String::from("app1"),
            units: vec![Unit::new("app1/0", "1"), Unit::new("app1/1", "1")],
        };
        let placements = app.machine_units();
        assert_eq!(placements.len(), 2);
        assert_eq!(
            placements[1],
            MachineUnit {
                machine_id: String::from("1"),
                unit_name: String::from("app1/1"),
            }
        );
    }

    #[test]
    fn test_model_status_parses_channel_field() {
        let status: ModelStatus = serde_json::from_value(serde_json::json!({
            "applications": {
                "cinder": {"charm": "ch:amd64/jammy/cinder-k8s-50", "charm-channel": "2023.2/edge"}
            }
        }))
        .expect("status");
        let cinder = &status.applications["cinder"];
        assert_eq!(cinder.charm_channel.as_deref(), Some("2023.2/edge"));
    }
}
