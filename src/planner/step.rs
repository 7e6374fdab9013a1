//! The step contract: one unit of idempotent, retryable work.

use async_trait::async_trait;

use super::result::StepResult;

/// A unit of idempotent work inside a plan.
///
/// `is_skip` only observes. It answers whether the desired state is
/// already reached (`SKIPPED`), whether the step must proceed
/// (`COMPLETED`), or whether a precondition needed to even decide is
/// missing (`FAILED`). `run` performs the side effects and returns
/// `COMPLETED` or `FAILED`.
///
/// Both take `&mut self` so a step can remember what `is_skip` resolved
/// (a machine id, a unit name) for the following `run` of the same plan.
#[async_trait]
pub trait Step: Send {
    /// Short name shown in progress output.
    fn name(&self) -> &str;

    /// Longer description of what the step does.
    fn description(&self) -> &str;

    /// Whether the step needs interactive input.
    fn has_prompts(&self) -> bool {
        false
    }

    /// Decides whether the step can be skipped.
    async fn is_skip(&mut self) -> StepResult {
        StepResult::completed()
    }

    /// Performs the step.
    async fn run(&mut self) -> StepResult;
}
