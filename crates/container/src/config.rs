use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

const FAILURE_POLICY_VAR: &str = "ELIF_CONTAINER_FAILURE_POLICY";
const VALIDATE_ON_SEAL_VAR: &str = "ELIF_CONTAINER_VALIDATE_ON_SEAL";
const MAX_DEPTH_VAR: &str = "ELIF_CONTAINER_MAX_DEPTH";

/// What happens when a cached (singleton or scoped) construction fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The failure is returned and the next resolution constructs again
    #[default]
    Retry,
    /// The first failure is stored and replayed to every later caller
    Memoize,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "retry" => Ok(FailurePolicy::Retry),
            "memoize" => Ok(FailurePolicy::Memoize),
            _ => Err(ConfigError::invalid_value(
                "failure_policy",
                s,
                "retry or memoize",
            )),
        }
    }
}

/// Container configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub failure_policy: FailurePolicy,
    /// Check declared dependencies for cycles and missing bindings when sealing
    pub validate_on_seal: bool,
    /// Longest resolution chain accepted before failing
    pub max_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Retry,
            validate_on_seal: true,
            max_depth: 128,
        }
    }
}

impl ContainerConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var(FAILURE_POLICY_VAR) {
            config.failure_policy = value.parse()?;
        }

        if let Ok(value) = env::var(VALIDATE_ON_SEAL_VAR) {
            config.validate_on_seal = parse_bool(VALIDATE_ON_SEAL_VAR, &value)?;
        }

        if let Ok(value) = env::var(MAX_DEPTH_VAR) {
            config.max_depth = value.parse().map_err(|_| {
                ConfigError::invalid_value(MAX_DEPTH_VAR, &value, "a positive integer")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON document
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::validation_failed(
                "max_depth must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_validation(mut self, validate_on_seal: bool) -> Self {
        self.validate_on_seal = validate_on_seal;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(field, value, "true or false")),
    }
}
