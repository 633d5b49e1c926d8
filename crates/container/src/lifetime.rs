use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Policy governing instance reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// New instance created for each resolution
    #[default]
    Transient,
    /// Single instance shared for the life of the container
    Singleton,
    /// Single instance per scope (e.g., one per request)
    Scoped,
}

impl Lifetime {
    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Lifetime::Transient)
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Lifetime::Scoped)
    }

    /// Whether instances of this lifetime are cached at all
    pub fn is_cached(&self) -> bool {
        !self.is_transient()
    }

    /// Get the lifetime name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Lifetime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transient" => Ok(Lifetime::Transient),
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            _ => Err(ConfigError::invalid_value(
                "lifetime",
                s,
                "transient, singleton, or scoped",
            )),
        }
    }
}
