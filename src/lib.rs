// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Fleet Orchestrator
//!
//! An idempotent step/plan engine that converges a fleet of machines onto a
//! charm-based application topology, driving a model-driven deployment
//! controller and an infra-as-code tool.
//!
//! ## Overview
//!
//! Work is expressed as **steps**. Every step first answers `is_skip`
//! from live controller state, then `run`s its side effects. Steps are
//! assembled into ordered **plans**; the executor stops at the first
//! failure and never rolls back.
//!
//! ## Modules
//!
//! - [`planner`]: Result model, step contract, retry policy and plan executor
//! - [`controller`]: Deployment controller client, channel comparison, upgrades
//! - [`infra`]: Infra-as-code tool interface and apply steps
//! - [`membership`]: Cluster membership store and its local file backend
//! - [`steps`]: Machine-unit reconciliation steps
//! - [`plugins`]: Optional feature lifecycle
//! - [`config`]: Configuration parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! store:
//!   path: /var/lib/fleet/cluster.json
//! timeouts:
//!   unit_secs: 600
//! retry:
//!   max_attempts: 5
//!   pause_secs: 60
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod infra;
pub mod membership;
pub mod planner;
pub mod plugins;
pub mod steps;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ConfigParser, ConfigValidator, OrchestratorConfig};
pub use controller::{DeploymentController, UpgradeApplicationsStep};
pub use error::{OrchestratorError, Result};
pub use infra::{InfraApplyStep, InfraInitStep, InfraTool};
pub use membership::{LocalMembershipStore, MembershipStore};
pub use planner::{run_plan, Plan, PlanExecutor, PlanReport, ResultType, Step, StepResult};
pub use plugins::{FeaturePlugin, Plugin, PluginManager};
pub use steps::{AddMachineUnitsStep, DeployMachineApplicationStep, RemoveMachineUnitsStep};
