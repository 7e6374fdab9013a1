//! Configuration parser for loading `fleet.yaml` and environment overrides.

use crate::error::{ConfigError, OrchestratorError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::settings::OrchestratorConfig;

/// Overrides `store.path`.
pub const ENV_STORE_PATH: &str = "FLEET_STORE_PATH";
/// Overrides `retry.max_attempts`.
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "FLEET_RETRY_MAX_ATTEMPTS";
/// Overrides `retry.pause_secs`.
pub const ENV_RETRY_PAUSE_SECS: &str = "FLEET_RETRY_PAUSE_SECS";

/// Configuration parser for the orchestrator.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory holding the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<OrchestratorConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string. An empty document yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<OrchestratorConfig> {
        if content.trim().is_empty() {
            debug!("Empty configuration, using defaults");
            return Ok(OrchestratorConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            OrchestratorError::from(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    /// Loads a configuration file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// override is not a number.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<OrchestratorConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `FLEET_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_overrides<F>(config: &mut OrchestratorConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STORE_PATH) {
            debug!("Overriding store.path from environment");
            config.store.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
            debug!("Overriding retry.max_attempts from environment");
            config.retry.max_attempts = parse_number(ENV_RETRY_MAX_ATTEMPTS, &value)?;
        }

        if let Some(value) = lookup(ENV_RETRY_PAUSE_SECS) {
            debug!("Overriding retry.pause_secs from environment");
            config.retry.pause_secs = parse_number(ENV_RETRY_PAUSE_SECS, &value)?;
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::ParseError {
            message: format!("{key} must be a non-negative integer, got '{value}'"),
            location: Some(String::from("environment")),
        }
        .into()
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["fleet.yaml", "fleet.yml"];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }
    .into())
}
