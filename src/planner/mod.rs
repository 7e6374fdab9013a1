//! Step and plan execution engine.
//!
//! This module defines the result vocabulary, the step contract, bounded
//! retry policies and the executor that runs an ordered plan of steps.

mod executor;
mod result;
mod retry;
mod step;

pub use executor::{run_plan, Plan, PlanExecutor, PlanReport, StepPhase, StepRecord};
pub use result::{ResultType, StepResult};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_PAUSE};
pub use step::Step;
