//! Outcome vocabulary shared by every step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal classification of one `is_skip` or `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultType {
    /// The step must proceed (from `is_skip`) or finished (from `run`).
    Completed,
    /// The step failed; the plan stops here.
    Failed,
    /// Desired state is already achieved.
    Skipped,
}

/// Immutable outcome of a single step call.
///
/// A non-completed result always carries a message; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    result_type: ResultType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl StepResult {
    /// A plain completed result.
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            result_type: ResultType::Completed,
            message: None,
            payload: None,
        }
    }

    /// A completed result carrying data for later steps or the caller.
    #[must_use]
    pub const fn completed_with(payload: Value) -> Self {
        Self {
            result_type: ResultType::Completed,
            message: None,
            payload: Some(payload),
        }
    }

    /// A skipped result explaining why nothing needs doing.
    #[must_use]
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            result_type: ResultType::Skipped,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// A failed result carrying a human-readable message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result_type: ResultType::Failed,
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Returns the classification.
    #[must_use]
    pub const fn result_type(&self) -> ResultType {
        self.result_type
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the payload, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Returns true for `COMPLETED`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.result_type == ResultType::Completed
    }

    /// Returns true for `SKIPPED`.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.result_type == ResultType::Skipped
    }

    /// Returns true for `FAILED`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.result_type == ResultType::Failed
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for StepResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result_type)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}
