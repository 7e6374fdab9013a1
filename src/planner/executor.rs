//! Plan executor.
//!
//! A plan is an ordered list of steps. Each step is asked `is_skip` first;
//! a skipped step is recorded and passed over, a failed check or a failed
//! run stops the whole plan. Earlier steps are never rolled back.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::result::{ResultType, StepResult};
use super::step::Step;

/// An ordered sequence of steps, consumed by one execution.
pub type Plan = Vec<Box<dyn Step>>;

/// Which call produced a recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// The result came from `is_skip`.
    SkipCheck,
    /// The result came from `run`.
    Run,
}

/// Terminal result of one step within a plan.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step name.
    pub step: String,
    /// Call that produced the result.
    pub phase: StepPhase,
    /// The result.
    pub result: StepResult,
}

/// Report of one plan execution.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Unique identifier of this execution.
    pub run_id: Uuid,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When execution finished.
    pub finished_at: DateTime<Utc>,
    /// Steps that were evaluated, in order.
    pub records: Vec<StepRecord>,
    /// Number of steps in the plan.
    pub total_steps: usize,
    /// `COMPLETED`, or the first `FAILED` result.
    pub outcome: StepResult,
}

/// Executor for plans.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanExecutor;

impl PlanExecutor {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes a plan, stopping at the first failure.
    pub async fn execute(&self, plan: Plan) -> PlanReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total_steps = plan.len();
        info!("Executing plan {run_id} with {total_steps} steps");

        let mut records = Vec::with_capacity(total_steps);
        let mut outcome = StepResult::completed();

        for mut step in plan {
            let name = step.name().to_string();

            if step.has_prompts() {
                debug!("Step '{name}' declares interactive prompts");
            }

            debug!("Evaluating step: {}", step.description());
            let skip = step.is_skip().await;
            match skip.result_type() {
                ResultType::Skipped => {
                    info!(
                        "Skipping step '{name}': {}",
                        skip.message().unwrap_or_default()
                    );
                    records.push(StepRecord {
                        step: name,
                        phase: StepPhase::SkipCheck,
                        result: skip,
                    });
                    continue;
                }
                ResultType::Failed => {
                    error!(
                        "Step '{name}' failed its skip check: {}",
                        skip.message().unwrap_or_default()
                    );
                    outcome = skip.clone();
                    records.push(StepRecord {
                        step: name,
                        phase: StepPhase::SkipCheck,
                        result: skip,
                    });
                    break;
                }
                ResultType::Completed => {}
            }

            info!("Running step '{name}'");
            let result = step.run().await;
            let failed = result.is_failed();
            if failed {
                error!(
                    "Step '{name}' failed: {}",
                    result.message().unwrap_or_default()
                );
                outcome = result.clone();
            }

            records.push(StepRecord {
                step: name,
                phase: StepPhase::Run,
                result,
            });

            if failed {
                break;
            }
        }

        if outcome.is_failed() && records.len() < total_steps {
            warn!(
                "Plan {run_id} stopped after {} of {total_steps} steps",
                records.len()
            );
        }

        PlanReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            records,
            total_steps,
            outcome,
        }
    }
}

/// Runs a plan with the default executor and returns its outcome.
pub async fn run_plan(plan: Plan) -> StepResult {
    PlanExecutor::new().execute(plan).await.outcome
}

impl PlanReport {
    /// Returns true if no step failed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.outcome.is_failed()
    }

    /// Returns the name of the step that failed, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.result.is_failed())
            .map(|r| r.step.as_str())
    }

    /// Returns the result recorded for a step, if it was evaluated.
    #[must_use]
    pub fn result_of(&self, step: &str) -> Option<&StepResult> {
        self.records
            .iter()
            .find(|r| r.step == step)
            .map(|r| &r.result)
    }

    /// Number of steps that were skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.result.is_skipped()).count()
    }
}

impl std::fmt::Display for PlanReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ran = self
            .records
            .iter()
            .filter(|r| r.phase == StepPhase::Run && r.result.is_completed())
            .count();
        write!(
            f,
            "Plan {}: {} of {} steps evaluated, {ran} ran, {} skipped",
            self.outcome.result_type(),
            self.records.len(),
            self.total_steps,
            self.skipped()
        )?;
        if let Some(step) = self.failed_step() {
            write!(f, ", failed at '{step}'")?;
        }
        Ok(())
    }
}
