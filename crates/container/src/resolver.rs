//! The resolution engine
//!
//! Resolution of a key inside a [`ResolutionContext`] runs these steps:
//!
//! 1. A key already on the resolution stack closes a cycle and fails with
//!    [`ContainerError::CircularDependency`].
//! 2. The producer is chosen: a contextual override for the consumer being
//!    built, then the global binding, then an implicit producer for
//!    [`Injectable`] types, otherwise [`ContainerError::UnresolvableBinding`].
//! 3. The key is pushed for the duration of construction and the lifecycle
//!    manager returns a cached instance or invokes the producer.
//!
//! Factories resolve their own dependencies through the same context, so
//! a single stack spans the whole call graph.

use std::sync::Arc;

use crate::autowiring::Injectable;
use crate::binding::{Factory, Instance};
use crate::context::ResolutionContext;
use crate::errors::ContainerError;
use crate::key::{CapabilityKey, ServiceToken};
use crate::lifecycle::SlotKey;
use crate::lifetime::Lifetime;

/// Trait for resolving services from the container or from within a factory
///
/// Only [`Resolver::resolve_with_fallback`] is required; the typed methods
/// are built on it. Implemented by [`crate::Container`] (root requests),
/// [`crate::ScopedResolver`] (root requests inside a scope) and
/// [`ResolutionContext`] (nested requests made by factories).
pub trait Resolver {
    /// Resolve `key`, using `fallback` as the producer when nothing is bound
    fn resolve_with_fallback(
        &self,
        key: &CapabilityKey,
        fallback: Option<&Factory>,
    ) -> Result<Instance, ContainerError>;

    /// Resolve a key to a type-erased instance
    fn resolve_key(&self, key: &CapabilityKey) -> Result<Instance, ContainerError> {
        self.resolve_with_fallback(key, None)
    }

    /// Resolve a service by type
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError>
    where
        Self: Sized,
    {
        let key = CapabilityKey::of::<T>();
        self.resolve_key(&key)?.downcast::<T>(&key)
    }

    /// Resolve a named service
    fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ContainerError>
    where
        Self: Sized,
    {
        let key = CapabilityKey::named::<T>(name);
        self.resolve_key(&key)?.downcast::<T>(&key)
    }

    /// Resolve the service a token stands for
    fn resolve_token<Token: ServiceToken>(&self) -> Result<Arc<Token::Service>, ContainerError>
    where
        Self: Sized,
    {
        let key = CapabilityKey::token::<Token>();
        self.resolve_key(&key)?.downcast::<Token::Service>(&key)
    }

    /// Resolve a named token binding
    fn resolve_token_named<Token: ServiceToken>(
        &self,
        name: &str,
    ) -> Result<Arc<Token::Service>, ContainerError>
    where
        Self: Sized,
    {
        let key = CapabilityKey::token_named::<Token>(name);
        self.resolve_key(&key)?.downcast::<Token::Service>(&key)
    }

    /// Resolve an injectable type, constructing it from its dependencies when unbound
    fn resolve_injectable<T: Injectable>(&self) -> Result<Arc<T>, ContainerError>
    where
        Self: Sized,
    {
        let key = CapabilityKey::of::<T>();
        let implicit = Factory::injectable::<T>();
        self.resolve_with_fallback(&key, Some(&implicit))?
            .downcast::<T>(&key)
    }

    /// Resolve a service, returning `None` when that exact key has no producer
    ///
    /// Failures of the service's own dependencies still propagate.
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ContainerError>
    where
        Self: Sized,
    {
        let key = CapabilityKey::of::<T>();
        match self.resolve_key(&key) {
            Ok(instance) => instance.downcast::<T>(&key).map(Some),
            Err(ContainerError::UnresolvableBinding { key: missing, .. }) if missing == key => {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

impl Resolver for ResolutionContext<'_> {
    fn resolve_with_fallback(
        &self,
        key: &CapabilityKey,
        fallback: Option<&Factory>,
    ) -> Result<Instance, ContainerError> {
        if self.is_constructing(key) {
            let cycle = self.cycle_to(key);
            tracing::debug!(key = %key, "Circular dependency detected");
            return Err(ContainerError::CircularDependency { cycle });
        }

        let container = self.container;
        let consumer = self.consumer();
        let contextual = consumer
            .as_ref()
            .and_then(|consumer| container.overrides.lookup(consumer, key));

        let (slot, factory, lifetime) = if let Some(entry) = contextual {
            let slot = SlotKey::Override {
                consumer: entry.consumer.clone(),
                dependency: key.clone(),
            };
            (slot, &entry.factory, entry.lifetime)
        } else if let Some(binding) = container.registry.lookup(key) {
            (SlotKey::Binding(key.clone()), &binding.factory, binding.lifetime)
        } else if let Some(implicit) = fallback {
            (SlotKey::Binding(key.clone()), implicit, Lifetime::Transient)
        } else {
            return Err(ContainerError::unresolvable(key.clone(), self.stack()));
        };

        tracing::trace!(
            key = %key,
            lifetime = %lifetime,
            contextual = contextual.is_some(),
            depth = self.depth(),
            "Resolving capability"
        );

        let _frame = self.enter(key)?;
        container
            .lifecycle
            .obtain(&slot, lifetime, factory, self)
            .map_err(|error| self.attribute(error, key))
    }
}

impl ResolutionContext<'_> {
    /// Attach the key and chain to failures raised by factory code
    ///
    /// Errors produced by the container itself already carry their own
    /// context and are passed through unchanged.
    fn attribute(&self, error: ContainerError, key: &CapabilityKey) -> ContainerError {
        match error {
            ContainerError::Factory { source } => {
                let chain = self.stack();
                tracing::debug!(key = %key, error = %source, "Factory failed");
                ContainerError::ConstructionFailure {
                    key: key.clone(),
                    chain,
                    source,
                }
            }
            other => other,
        }
    }
}
