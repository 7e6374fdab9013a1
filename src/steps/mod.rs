//! Machine-unit reconciliation steps.
//!
//! Each step works on one application in one controller model and one
//! infra configuration. Skip decisions are always taken from the live
//! controller state, so a step can be re-run after a partial failure.

mod deploy;
mod units;

pub use deploy::DeployMachineApplicationStep;
pub use units::{AddMachineUnitsStep, RemoveMachineUnitsStep};

use std::time::Duration;

/// Default convergence wait for reconciliation steps.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(1200);

/// Variable carrying the machines an application is placed on.
pub const MACHINE_IDS_VAR: &str = "machine_ids";

/// Variable carrying the controller model of a machine application.
pub const MACHINE_MODEL_VAR: &str = "machine_model";
