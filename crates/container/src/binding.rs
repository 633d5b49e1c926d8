use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::autowiring::Injectable;
use crate::context::ResolutionContext;
use crate::errors::ContainerError;
use crate::key::CapabilityKey;
use crate::lifetime::Lifetime;

/// A constructed, type-erased service instance
///
/// The erased value is always an `Arc<T>`, so trait objects and concrete
/// types are stored the same way and identity survives cache hits.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Wrap a shared value
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Recover the typed `Arc<T>` this instance was created from
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &CapabilityKey,
    ) -> Result<Arc<T>, ContainerError> {
        self.inner
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| ContainerError::TypeMismatch {
                key: key.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Name of the type the instance was created from
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

type FactoryFn = dyn Fn(&ResolutionContext<'_>) -> Result<Instance, ContainerError> + Send + Sync;

/// Producer invoked by the resolution engine to construct an instance
#[derive(Clone)]
pub struct Factory {
    produce: Arc<FactoryFn>,
}

impl Factory {
    /// Create a factory from a function returning an erased instance
    pub fn from_fn<F>(produce: F) -> Self
    where
        F: Fn(&ResolutionContext<'_>) -> Result<Instance, ContainerError> + Send + Sync + 'static,
    {
        Self {
            produce: Arc::new(produce),
        }
    }

    /// Create a factory for a sized value
    pub fn new<T, F>(produce: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        Self::from_fn(move |ctx| produce(ctx).map(|value| Instance::new(Arc::new(value))))
    }

    /// Create a factory returning a shared value, typically a trait object
    pub fn shared<T, F>(produce: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<T>, ContainerError> + Send + Sync + 'static,
    {
        Self::from_fn(move |ctx| produce(ctx).map(Instance::new))
    }

    /// Create a factory that hands out clones of an existing instance
    pub fn instance<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::from_fn(move |_| Ok(Instance::new(value.clone())))
    }

    /// Create a factory that constructs `T` from its declared dependencies
    pub fn injectable<T: Injectable>() -> Self {
        Self::new(|ctx| T::create(ctx))
    }

    pub(crate) fn invoke(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        (self.produce)(ctx)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Factory(<factory_fn>)")
    }
}

/// Registered mapping from a key to a producer plus its lifetime policy
#[derive(Debug, Clone)]
pub struct Binding {
    pub key: CapabilityKey,
    pub factory: Factory,
    pub lifetime: Lifetime,
    /// Declared dependencies, used for validation when the container is sealed
    pub dependencies: Vec<CapabilityKey>,
}

impl Binding {
    pub fn new(key: CapabilityKey, factory: Factory, lifetime: Lifetime) -> Self {
        Self {
            key,
            factory,
            lifetime,
            dependencies: Vec::new(),
        }
    }

    /// Binding for an injectable type, carrying its declared dependencies
    pub fn injectable<T: Injectable>(lifetime: Lifetime) -> Self {
        Self {
            key: CapabilityKey::of::<T>(),
            factory: Factory::injectable::<T>(),
            lifetime,
            dependencies: T::dependencies(),
        }
    }

    /// Declare a dependency of this binding
    pub fn depends_on(mut self, key: CapabilityKey) -> Self {
        self.dependencies.push(key);
        self
    }

    /// Declare several dependencies of this binding
    pub fn with_dependencies(mut self, keys: impl IntoIterator<Item = CapabilityKey>) -> Self {
        self.dependencies.extend(keys);
        self
    }
}

/// Storage for bindings with an explicit registration phase
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<CapabilityKey, Binding>,
    /// Keys in first-registration order
    order: Vec<CapabilityKey>,
    sealed: bool,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the binding for its key
    pub fn register(&mut self, binding: Binding) -> Result<(), ContainerError> {
        if self.sealed {
            return Err(ContainerError::registration_after_seal(&binding.key));
        }

        let key = binding.key.clone();
        if let Some(previous) = self.bindings.insert(key.clone(), binding) {
            tracing::debug!(
                key = %key,
                previous_lifetime = %previous.lifetime,
                "Replacing existing binding"
            );
        } else {
            self.order.push(key);
        }

        Ok(())
    }

    /// Make the registry read-only. Idempotent.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn lookup(&self, key: &CapabilityKey) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Registered keys in first-registration order
    pub fn keys(&self) -> &[CapabilityKey] {
        &self.order
    }

    /// Bindings in first-registration order
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.order.iter().filter_map(|key| self.bindings.get(key))
    }
}
