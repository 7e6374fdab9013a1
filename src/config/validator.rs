//! Configuration validation.

use crate::error::{ConfigError, Result};
use tracing::{debug, warn};

use super::settings::OrchestratorConfig;

/// Pauses longer than this only produce a warning.
const MAX_REASONABLE_PAUSE_SECS: u64 = 600;

/// Validator for orchestrator configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all issues found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error found.
    pub fn validate(&self, config: &OrchestratorConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_store(config, &mut result);
        Self::validate_timeouts(config, &mut result);
        Self::validate_retry(config, &mut result);

        for warning in &result.warnings {
            warn!("{warning}");
        }

        match result.errors.first() {
            None => {
                debug!("Configuration validation passed");
                Ok(result)
            }
            Some(first) => {
                Err(ConfigError::validation(first.message.clone(), first.field.clone()).into())
            }
        }
    }

    fn validate_store(config: &OrchestratorConfig, result: &mut ValidationResult) {
        if config
            .store
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            result.errors.push(ValidationError {
                field: String::from("store.path"),
                message: String::from("Store path cannot be empty"),
            });
        }
    }

    fn validate_timeouts(config: &OrchestratorConfig, result: &mut ValidationResult) {
        let timeouts = [
            ("timeouts.deploy_secs", config.timeouts.deploy_secs),
            ("timeouts.unit_secs", config.timeouts.unit_secs),
            ("timeouts.upgrade_secs", config.timeouts.upgrade_secs),
        ];

        for (field, secs) in timeouts {
            if secs == 0 {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("{field} must be greater than zero"),
                });
            }
        }
    }

    fn validate_retry(config: &OrchestratorConfig, result: &mut ValidationResult) {
        if config.retry.max_attempts == 0 {
            result.errors.push(ValidationError {
                field: String::from("retry.max_attempts"),
                message: String::from("retry.max_attempts must be at least 1"),
            });
        }

        if config.retry.pause_secs > MAX_REASONABLE_PAUSE_SECS {
            result.warnings.push(format!(
                "retry.pause_secs is {}s; applies may stall for a long time on a held lock",
                config.retry.pause_secs
            ));
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
