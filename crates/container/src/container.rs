use std::sync::Arc;

use crate::autowiring::Injectable;
use crate::binding::{Binding, BindingRegistry, Factory, Instance};
use crate::config::ContainerConfig;
use crate::context::ResolutionContext;
use crate::errors::ContainerError;
use crate::key::{CapabilityKey, ServiceToken};
use crate::lifecycle::{LifecycleManager, SlotKey};
use crate::lifetime::Lifetime;
use crate::overrides::{ContextualOverride, ContextualOverrideTable};
use crate::resolver::Resolver;
use crate::scope::ScopeHandle;
use crate::validation::DependencyGraph;

/// Dependency injection container with an explicit registration phase
///
/// A container starts open: bindings and contextual overrides may be added
/// or replaced. [`Container::seal`] makes it read-only; from then on it only
/// resolves and manages scopes, and can be shared across threads behind an
/// `Arc` or installed globally with [`crate::global::install`].
///
/// ```rust
/// use elif_container::{Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserRepository { db: Arc<Database> }
///
/// let mut container = Container::new();
/// container
///     .bind(Lifetime::Singleton, |_| Ok(Database { url: "postgres://localhost".into() }))?
///     .bind(Lifetime::Transient, |ctx| Ok(UserRepository { db: ctx.resolve::<Database>()? }))?;
/// container.seal()?;
///
/// let repository = container.resolve::<UserRepository>()?;
/// assert_eq!(repository.db.url, "postgres://localhost");
/// # Ok::<(), elif_container::ContainerError>(())
/// ```
#[derive(Debug)]
pub struct Container {
    pub(crate) registry: BindingRegistry,
    pub(crate) overrides: ContextualOverrideTable,
    pub(crate) lifecycle: LifecycleManager,
    config: ContainerConfig,
}

impl Container {
    /// Create an open container with default configuration
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            registry: BindingRegistry::new(),
            overrides: ContextualOverrideTable::new(),
            lifecycle: LifecycleManager::new(config.failure_policy),
            config,
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Register `factory` for `key`, replacing any previous binding
    pub fn register(
        &mut self,
        key: CapabilityKey,
        factory: Factory,
        lifetime: Lifetime,
    ) -> Result<&mut Self, ContainerError> {
        self.register_binding(Binding::new(key, factory, lifetime))
    }

    pub fn register_binding(&mut self, binding: Binding) -> Result<&mut Self, ContainerError> {
        tracing::trace!(key = %binding.key, lifetime = %binding.lifetime, "Registering binding");
        self.registry.register(binding)?;
        Ok(self)
    }

    /// Bind a concrete type to a factory
    pub fn bind<T, F>(&mut self, lifetime: Lifetime, factory: F) -> Result<&mut Self, ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.register(CapabilityKey::of::<T>(), Factory::new(factory), lifetime)
    }

    /// Bind a type, usually a trait object, to a factory returning `Arc<T>`
    pub fn bind_shared<T, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<T>, ContainerError> + Send + Sync + 'static,
    {
        self.register(CapabilityKey::of::<T>(), Factory::shared(factory), lifetime)
    }

    /// Bind one of several named implementations of a type
    pub fn bind_named<T, F>(
        &mut self,
        name: impl Into<String>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<T>, ContainerError> + Send + Sync + 'static,
    {
        self.register(CapabilityKey::named::<T>(name), Factory::shared(factory), lifetime)
    }

    /// Bind a service token to a factory for its service
    pub fn bind_token<Token, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, ContainerError>
    where
        Token: ServiceToken,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<Token::Service>, ContainerError>
            + Send
            + Sync
            + 'static,
    {
        self.register(CapabilityKey::token::<Token>(), Factory::shared(factory), lifetime)
    }

    /// Bind a named service token
    pub fn bind_token_named<Token, F>(
        &mut self,
        name: impl Into<String>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<&mut Self, ContainerError>
    where
        Token: ServiceToken,
        F: Fn(&ResolutionContext<'_>) -> Result<Arc<Token::Service>, ContainerError>
            + Send
            + Sync
            + 'static,
    {
        self.register(
            CapabilityKey::token_named::<Token>(name),
            Factory::shared(factory),
            lifetime,
        )
    }

    /// Bind an already constructed instance as a singleton
    pub fn bind_instance<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        instance: Arc<T>,
    ) -> Result<&mut Self, ContainerError> {
        self.register(
            CapabilityKey::of::<T>(),
            Factory::instance(instance),
            Lifetime::Singleton,
        )
    }

    /// Bind an injectable type, declaring its dependencies for validation
    pub fn bind_injectable<T: Injectable>(
        &mut self,
        lifetime: Lifetime,
    ) -> Result<&mut Self, ContainerError> {
        self.register_binding(Binding::injectable::<T>(lifetime))
    }

    /// Use `factory` for `dependency` only while `consumer` is being constructed
    pub fn override_for(
        &mut self,
        consumer: CapabilityKey,
        dependency: CapabilityKey,
        factory: Factory,
    ) -> Result<&mut Self, ContainerError> {
        self.override_with_lifetime(consumer, dependency, factory, Lifetime::Transient)
    }

    /// Contextual override with its own lifetime, cached apart from the global binding
    pub fn override_with_lifetime(
        &mut self,
        consumer: CapabilityKey,
        dependency: CapabilityKey,
        factory: Factory,
        lifetime: Lifetime,
    ) -> Result<&mut Self, ContainerError> {
        tracing::trace!(
            consumer = %consumer,
            dependency = %dependency,
            "Registering contextual override"
        );
        self.overrides.insert(ContextualOverride {
            consumer,
            dependency,
            factory,
            lifetime,
        })?;
        Ok(self)
    }

    /// End the registration phase. Idempotent.
    ///
    /// With `validate_on_seal` the declared dependency graph is checked
    /// first; on failure the container stays open so the configuration can
    /// be corrected.
    pub fn seal(&mut self) -> Result<(), ContainerError> {
        if self.is_sealed() {
            return Ok(());
        }

        if self.config.validate_on_seal {
            DependencyGraph::build(&self.registry, &self.overrides).validate()?;
        }

        self.registry.seal();
        self.overrides.seal();

        tracing::info!(
            bindings = self.registry.len(),
            overrides = self.overrides.len(),
            "Container sealed"
        );
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.registry.is_sealed()
    }

    /// Check if a key has a global binding
    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.registry.contains(key)
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Declared dependency graph of the registered bindings
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(&self.registry, &self.overrides)
    }

    /// Resolve `key` as a top-level request with a fresh resolution context
    pub fn resolve_root(&self, key: &CapabilityKey) -> Result<Instance, ContainerError> {
        self.resolve_root_in(key, None, None)
    }

    fn resolve_root_in(
        &self,
        key: &CapabilityKey,
        scope: Option<&ScopeHandle>,
        fallback: Option<&Factory>,
    ) -> Result<Instance, ContainerError> {
        if !self.is_sealed() {
            return Err(ContainerError::NotSealed);
        }

        let ctx = ResolutionContext::new(self, scope.cloned());
        ctx.resolve_with_fallback(key, fallback)
    }

    /// Start a scope on the sealed container
    pub fn begin_scope(&self) -> Result<ScopeHandle, ContainerError> {
        if !self.is_sealed() {
            return Err(ContainerError::NotSealed);
        }
        self.lifecycle.begin_scope()
    }

    /// End a scope, discarding its cached instances
    pub fn end_scope(&self, handle: &ScopeHandle) -> Result<(), ContainerError> {
        self.lifecycle.end_scope(handle)
    }

    /// Resolver for root requests inside `scope`
    pub fn scope<'c>(&'c self, handle: &ScopeHandle) -> ScopedResolver<'c> {
        ScopedResolver {
            container: self,
            handle: handle.clone(),
        }
    }

    /// Cached singleton for a key, without constructing it
    pub fn cached_singleton(&self, key: &CapabilityKey) -> Option<Instance> {
        self.lifecycle.singleton(&SlotKey::Binding(key.clone()))
    }

    pub fn statistics(&self) -> ContainerStatistics {
        let mut stats = ContainerStatistics {
            bindings: self.registry.len(),
            overrides: self.overrides.len(),
            cached_singletons: self.lifecycle.cached_singletons(),
            active_scopes: self.lifecycle.active_scopes(),
            ..ContainerStatistics::default()
        };

        for binding in self.registry.bindings() {
            match binding.lifetime {
                Lifetime::Singleton => stats.singletons += 1,
                Lifetime::Transient => stats.transients += 1,
                Lifetime::Scoped => stats.scoped += 1,
            }
        }

        stats
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for Container {
    fn resolve_with_fallback(
        &self,
        key: &CapabilityKey,
        fallback: Option<&Factory>,
    ) -> Result<Instance, ContainerError> {
        self.resolve_root_in(key, None, fallback)
    }
}

/// Resolves root requests within a scope
#[derive(Debug, Clone)]
pub struct ScopedResolver<'c> {
    container: &'c Container,
    handle: ScopeHandle,
}

impl ScopedResolver<'_> {
    pub fn handle(&self) -> &ScopeHandle {
        &self.handle
    }
}

impl Resolver for ScopedResolver<'_> {
    fn resolve_with_fallback(
        &self,
        key: &CapabilityKey,
        fallback: Option<&Factory>,
    ) -> Result<Instance, ContainerError> {
        self.container
            .resolve_root_in(key, Some(&self.handle), fallback)
    }
}

/// Service statistics for monitoring and debugging
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainerStatistics {
    pub bindings: usize,
    pub overrides: usize,
    pub singletons: usize,
    pub transients: usize,
    pub scoped: usize,
    pub cached_singletons: usize,
    pub active_scopes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Repository: Send + Sync {
        fn find(&self, id: u32) -> Option<String>;
    }

    struct PostgresRepository;

    impl Repository for PostgresRepository {
        fn find(&self, _id: u32) -> Option<String> {
            Some("postgres_data".to_string())
        }
    }

    struct InMemoryRepository;

    impl Repository for InMemoryRepository {
        fn find(&self, _id: u32) -> Option<String> {
            Some("memory_data".to_string())
        }
    }

    struct UserService {
        repository: Arc<dyn Repository>,
    }

    #[test]
    fn test_basic_binding_and_resolution() {
        let mut container = Container::new();
        container
            .bind_shared::<dyn Repository, _>(Lifetime::Transient, |_| {
                Ok(Arc::new(PostgresRepository))
            })
            .unwrap()
            .bind(Lifetime::Singleton, |ctx| {
                Ok(UserService {
                    repository: ctx.resolve::<dyn Repository>()?,
                })
            })
            .unwrap();
        container.seal().unwrap();

        let service = container.resolve::<UserService>().unwrap();
        assert_eq!(service.repository.find(1), Some("postgres_data".to_string()));
    }

    #[test]
    fn test_singleton_behavior() {
        let mut container = Container::new();
        container
            .bind(Lifetime::Singleton, |_| Ok(PostgresRepository))
            .unwrap();
        container.seal().unwrap();

        let first = container.resolve::<PostgresRepository>().unwrap();
        let second = container.resolve::<PostgresRepository>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(container
            .cached_singleton(&CapabilityKey::of::<PostgresRepository>())
            .is_some());
    }

    #[test]
    fn test_transient_behavior() {
        let mut container = Container::new();
        container
            .bind(Lifetime::Transient, |_| Ok(PostgresRepository))
            .unwrap();
        container.seal().unwrap();

        let first = container.resolve::<PostgresRepository>().unwrap();
        let second = container.resolve::<PostgresRepository>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_named_services() {
        let mut container = Container::new();
        container
            .bind_named::<dyn Repository, _>("primary", Lifetime::Singleton, |_| {
                Ok(Arc::new(PostgresRepository))
            })
            .unwrap()
            .bind_named::<dyn Repository, _>("cache", Lifetime::Singleton, |_| {
                Ok(Arc::new(InMemoryRepository))
            })
            .unwrap();
        container.seal().unwrap();

        let primary = container.resolve_named::<dyn Repository>("primary").unwrap();
        let cache = container.resolve_named::<dyn Repository>("cache").unwrap();
        assert_eq!(primary.find(1), Some("postgres_data".to_string()));
        assert_eq!(cache.find(1), Some("memory_data".to_string()));
        assert!(container.resolve::<dyn Repository>().is_err());
    }

    #[test]
    fn test_resolve_before_seal_fails() {
        let mut container = Container::new();
        container
            .bind(Lifetime::Transient, |_| Ok(PostgresRepository))
            .unwrap();

        let result = container.resolve::<PostgresRepository>();
        assert!(matches!(result, Err(ContainerError::NotSealed)));
    }

    #[test]
    fn test_begin_scope_before_seal_fails() {
        let mut container = Container::new();
        assert!(matches!(container.begin_scope(), Err(ContainerError::NotSealed)));

        container.seal().unwrap();
        let scope = container.begin_scope().unwrap();
        assert!(container.end_scope(&scope).is_ok());
    }

    #[test]
    fn test_seal_is_idempotent() {
        let mut container = Container::new();
        container.seal().unwrap();
        container.seal().unwrap();
        assert!(container.is_sealed());
    }

    #[test]
    fn test_failed_validation_leaves_container_open() {
        struct Missing;

        let mut container = Container::new();
        container
            .register_binding(
                Binding::new(
                    CapabilityKey::of::<UserService>(),
                    Factory::new(|ctx| {
                        Ok(UserService {
                            repository: ctx.resolve::<dyn Repository>()?,
                        })
                    }),
                    Lifetime::Transient,
                )
                .depends_on(CapabilityKey::of::<Missing>()),
            )
            .unwrap();

        assert!(matches!(
            container.seal(),
            Err(ContainerError::UnresolvableBinding { .. })
        ));
        assert!(!container.is_sealed());

        container
            .bind(Lifetime::Singleton, |_| Ok(Missing))
            .unwrap();
        assert!(container.seal().is_ok());
    }

    #[test]
    fn test_statistics() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = constructed.clone();

        let mut container = Container::new();
        container
            .bind(Lifetime::Singleton, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(PostgresRepository)
            })
            .unwrap()
            .bind(Lifetime::Transient, |_| Ok(InMemoryRepository))
            .unwrap()
            .bind_shared::<dyn Repository, _>(Lifetime::Scoped, |_| Ok(Arc::new(InMemoryRepository)))
            .unwrap();
        container.seal().unwrap();

        container.resolve::<PostgresRepository>().unwrap();
        let _scope = container.begin_scope().unwrap();

        let stats = container.statistics();
        assert_eq!(stats.bindings, 3);
        assert_eq!(stats.singletons, 1);
        assert_eq!(stats.transients, 1);
        assert_eq!(stats.scoped, 1);
        assert_eq!(stats.cached_singletons, 1);
        assert_eq!(stats.active_scopes, 1);
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }
}
