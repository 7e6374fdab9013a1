//! Error types for the fleet orchestrator.
//!
//! Every collaborator the engine talks to (deployment controller,
//! infra-as-code tool, membership store) has its own error enum. Steps
//! catch these at their boundary and turn them into `FAILED` results
//! carrying the collaborator message unchanged, so the `Display` output of
//! the message-bearing variants is the bare message.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the fleet orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Deployment controller errors.
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Infra-as-code tool errors.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Membership store errors.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Plugin lifecycle errors.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Flat classification of [`OrchestratorError`], used by retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The target application is absent from the model.
    ApplicationNotFound,
    /// A bounded wait expired.
    Timeout,
    /// The controller rejected or failed a request.
    ControllerRequest,
    /// A generic infra apply/init failure.
    InfraApply,
    /// The infra state is locked by another writer.
    InfraStateLocked,
    /// No persisted value exists for a key.
    ConfigItemNotFound,
    /// The membership store has no such node.
    NodeNotFound,
    /// Any other membership store failure.
    Store,
    /// Plugin lifecycle failure.
    Plugin,
    /// Configuration failure.
    Config,
    /// IO failure.
    Io,
    /// Anything else.
    Internal,
}

/// Deployment controller errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The application does not exist in the model.
    #[error("{message}")]
    ApplicationNotFound {
        /// Message reported by the controller.
        message: String,
    },

    /// A convergence wait expired.
    #[error("{message}")]
    Timeout {
        /// Message reported by the controller.
        message: String,
    },

    /// Any other controller failure.
    #[error("{message}")]
    Request {
        /// Message reported by the controller.
        message: String,
    },
}

/// Infra-as-code tool errors.
#[derive(Debug, Error)]
pub enum InfraError {
    /// Apply (or init) failed.
    #[error("{message}")]
    Apply {
        /// Message reported by the tool.
        message: String,
    },

    /// The state backend is locked by another writer. Transient.
    #[error("{message}")]
    StateLocked {
        /// Message reported by the tool.
        message: String,
    },
}

/// Membership store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No configuration item is stored under the key.
    #[error("ConfigItem not found: {key}")]
    ConfigItemNotFound {
        /// The missing key.
        key: String,
    },

    /// No node with this name is a cluster member.
    #[error("Node {name} not found")]
    NodeNotFound {
        /// The missing node name.
        name: String,
    },

    /// The store document is unreadable.
    #[error("Membership store is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The store could not be written.
    #[error("Failed to write membership store: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// Serialization error.
    #[error("Membership store serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Plugin lifecycle errors.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A mandatory requirement is not enabled.
    #[error("Plugin {plugin} requires plugin {requirement} to be enabled")]
    MissingRequirement {
        /// Plugin being enabled.
        plugin: String,
        /// Requirement that is not enabled.
        requirement: String,
    },

    /// The enable or disable plan failed.
    #[error("{message}")]
    PlanFailed {
        /// Plugin whose plan failed.
        plugin: String,
        /// Message of the failing step.
        message: String,
    },

    /// A hook reported a failure.
    #[error("Plugin {plugin} hook {hook} failed: {message}")]
    HookFailed {
        /// Plugin whose hook failed.
        plugin: String,
        /// Hook name.
        hook: String,
        /// Description of the failure.
        message: String,
    },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Controller(ControllerError::ApplicationNotFound { .. }) => {
                ErrorKind::ApplicationNotFound
            }
            Self::Controller(ControllerError::Timeout { .. }) => ErrorKind::Timeout,
            Self::Controller(ControllerError::Request { .. }) => ErrorKind::ControllerRequest,
            Self::Infra(InfraError::Apply { .. }) => ErrorKind::InfraApply,
            Self::Infra(InfraError::StateLocked { .. }) => ErrorKind::InfraStateLocked,
            Self::Store(StoreError::ConfigItemNotFound { .. }) => ErrorKind::ConfigItemNotFound,
            Self::Store(StoreError::NodeNotFound { .. }) => ErrorKind::NodeNotFound,
            Self::Store(_) => ErrorKind::Store,
            Self::Plugin(_) => ErrorKind::Plugin,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the target application does not exist.
    #[must_use]
    pub const fn is_application_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::ApplicationNotFound)
    }

    /// Returns true if no persisted value exists for the requested key.
    #[must_use]
    pub const fn is_config_item_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfigItemNotFound)
    }
}

impl ControllerError {
    /// Creates an application-not-found error.
    #[must_use]
    pub fn application_not_found(message: impl Into<String>) -> Self {
        Self::ApplicationNotFound {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }
}

impl InfraError {
    /// Creates a generic apply error.
    #[must_use]
    pub fn apply(message: impl Into<String>) -> Self {
        Self::Apply {
            message: message.into(),
        }
    }

    /// Creates a state-locked error.
    #[must_use]
    pub fn state_locked(message: impl Into<String>) -> Self {
        Self::StateLocked {
            message: message.into(),
        }
    }
}

impl StoreError {
    /// Creates a config-item-not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::ConfigItemNotFound { key: key.into() }
    }

    /// Creates a node-not-found error.
    #[must_use]
    pub fn node_not_found(name: impl Into<String>) -> Self {
        Self::NodeNotFound { name: name.into() }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}
