//! # elif-container
//!
//! Dependency injection container for elif.rs.
//!
//! The container maps capability keys to producers with a lifetime policy
//! (transient, singleton or scoped), resolves dependency graphs on demand,
//! applies per-consumer overrides and detects cycles. It has two phases: an
//! open registration phase, then a sealed phase in which it is read-only and
//! safe to share between threads.

pub mod autowiring;
pub mod binding;
pub mod boundary;
pub mod config;
#[allow(clippy::module_inception)]
pub mod container;
pub mod context;
pub mod errors;
pub mod global;
pub mod key;
pub mod lifetime;
pub mod overrides;
pub mod resolver;
pub mod scope;
pub mod validation;

mod lifecycle;

pub use autowiring::Injectable;
pub use binding::{Binding, BindingRegistry, Factory, Instance};
pub use boundary::{OutputPort, Port};
pub use config::{ContainerConfig, FailurePolicy};
pub use container::{Container, ContainerStatistics, ScopedResolver};
pub use context::ResolutionContext;
pub use errors::{ConfigError, ContainerError};
pub use key::{CapabilityKey, ServiceToken};
pub use lifetime::Lifetime;
pub use overrides::{ContextualOverride, ContextualOverrideTable};
pub use resolver::Resolver;
pub use scope::ScopeHandle;
pub use validation::DependencyGraph;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
