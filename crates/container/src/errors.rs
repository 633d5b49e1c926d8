use std::sync::Arc;
use thiserror::Error;

use crate::key::CapabilityKey;

/// Shared error source attached to factory failures
pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync>;

/// Error type for registration and resolution in the container
#[derive(Debug, Clone, Error)]
pub enum ContainerError {
    #[error("Cannot register '{key}': the container is sealed")]
    RegistrationAfterSeal { key: String },

    #[error("Container must be sealed before resolving services")]
    NotSealed,

    #[error("Circular dependency detected: {}", format_chain(.cycle))]
    CircularDependency { cycle: Vec<CapabilityKey> },

    #[error("No binding for '{key}' (requested by: {})", format_chain(.chain))]
    UnresolvableBinding {
        key: CapabilityKey,
        chain: Vec<CapabilityKey>,
    },

    #[error("Construction of '{key}' failed (chain: {}): {source}", format_chain(.chain))]
    ConstructionFailure {
        key: CapabilityKey,
        chain: Vec<CapabilityKey>,
        source: ErrorSource,
    },

    /// Raised by factory code and attributed to a key by the resolution engine
    #[error("Factory error: {source}")]
    Factory { source: ErrorSource },

    #[error("Instance bound to '{key}' is not of type '{expected}'")]
    TypeMismatch {
        key: CapabilityKey,
        expected: &'static str,
    },

    #[error("Scoped service '{key}' resolved outside of a scope")]
    ScopeRequired { key: CapabilityKey },

    #[error("Scope not found: {scope}")]
    ScopeNotFound { scope: String },

    #[error("Resolution depth limit of {limit} exceeded: {}", format_chain(.chain))]
    ResolutionDepthExceeded {
        limit: usize,
        chain: Vec<CapabilityKey>,
    },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },

    #[error("A global container is already installed")]
    AlreadyInstalled,

    #[error("No global container has been installed")]
    NotInstalled,
}

/// Message-only error used when a factory fails without an underlying error value
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FactoryMessage(pub String);

impl ContainerError {
    /// Wrap an error raised inside a factory
    pub fn factory<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Factory {
            source: Arc::new(source),
        }
    }

    /// Create a factory failure from a message
    pub fn factory_message(message: impl Into<String>) -> Self {
        Self::factory(FactoryMessage(message.into()))
    }

    /// Create a registration-after-seal error
    pub fn registration_after_seal(key: impl ToString) -> Self {
        Self::RegistrationAfterSeal {
            key: key.to_string(),
        }
    }

    /// Create an unresolvable binding error
    pub fn unresolvable(key: CapabilityKey, chain: Vec<CapabilityKey>) -> Self {
        Self::UnresolvableBinding { key, chain }
    }

    /// Check if the error is a circular dependency
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// Check if the error is an unresolvable binding
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Self::UnresolvableBinding { .. })
    }

    /// Check if the error is a construction failure
    pub fn is_construction_failure(&self) -> bool {
        matches!(self, Self::ConstructionFailure { .. })
    }

    /// Check if the error was raised by factory code rather than by the container
    pub fn is_factory_failure(&self) -> bool {
        matches!(
            self,
            Self::Factory { .. } | Self::ConstructionFailure { .. }
        )
    }

    /// Check if the error is a registration after seal
    pub fn is_registration_after_seal(&self) -> bool {
        matches!(self, Self::RegistrationAfterSeal { .. })
    }

    /// The resolution chain attached to this error, if any
    pub fn chain(&self) -> Option<&[CapabilityKey]> {
        match self {
            Self::CircularDependency { cycle } => Some(cycle),
            Self::UnresolvableBinding { chain, .. }
            | Self::ConstructionFailure { chain, .. }
            | Self::ResolutionDepthExceeded { chain, .. } => Some(chain),
            _ => None,
        }
    }
}

fn format_chain(chain: &[CapabilityKey]) -> String {
    if chain.is_empty() {
        return "<root>".to_string();
    }

    chain
        .iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}
