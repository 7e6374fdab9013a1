//! Configuration module for the fleet orchestrator.
//!
//! This module handles all configuration-related functionality:
//! - Parsing `fleet.yaml` with environment overrides
//! - Validation of configuration values

mod parser;
mod settings;
mod validator;

pub use parser::{
    find_config_file, ConfigParser, DEFAULT_CONFIG_FILES, ENV_RETRY_MAX_ATTEMPTS,
    ENV_RETRY_PAUSE_SECS, ENV_STORE_PATH,
};
pub use settings::{OrchestratorConfig, RetryConfig, StoreConfig, TimeoutConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
