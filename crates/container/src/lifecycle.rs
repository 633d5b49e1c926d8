//! Instance lifetimes and the singleton/scoped caches
//!
//! Each cached key owns a [`Slot`]: a write-once cell holding the finished
//! instance plus a construction mutex. The cache-wide map lock is only held
//! to look up or insert a slot, never while a factory runs, so resolutions
//! of different keys never wait on each other. Callers racing for the same
//! key serialize on that key's mutex and observe a single construction.
//!
//! A resolution about to block on a slot owned by another resolution first
//! consults the [`ConstructionGraph`]. If the owner is itself (transitively)
//! waiting on a slot this resolution owns, blocking would deadlock, and the
//! wait fails with [`ContainerError::CircularDependency`] instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, TryLockError};

use crate::binding::{Factory, Instance};
use crate::config::FailurePolicy;
use crate::context::ResolutionContext;
use crate::errors::ContainerError;
use crate::key::CapabilityKey;
use crate::lifetime::Lifetime;
use crate::scope::{ScopeHandle, ScopeRegistry};

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Cache identity of a producer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SlotKey {
    /// Global binding for a key
    Binding(CapabilityKey),
    /// Contextual override, cached apart from the global binding
    Override {
        consumer: CapabilityKey,
        dependency: CapabilityKey,
    },
}

impl SlotKey {
    pub(crate) fn key(&self) -> &CapabilityKey {
        match self {
            SlotKey::Binding(key) => key,
            SlotKey::Override { dependency, .. } => dependency,
        }
    }
}

#[derive(Debug)]
struct Slot {
    /// Unique across all caches, so scoped and singleton slots share one graph
    id: u64,
    ready: OnceLock<Instance>,
    /// Held while constructing; stores the failure under [`FailurePolicy::Memoize`]
    construction: Mutex<Option<ContainerError>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
            ready: OnceLock::new(),
            construction: Mutex::new(None),
        }
    }
}

#[derive(Debug)]
struct Waiting {
    slot: u64,
    /// Stack of the waiting resolution; its last key is the awaited one
    stack: Vec<CapabilityKey>,
}

#[derive(Debug, Default)]
struct GraphState {
    /// slot -> resolution constructing it
    owners: HashMap<u64, u64>,
    /// resolution -> slot it is blocked on
    waiting: HashMap<u64, Waiting>,
}

impl GraphState {
    /// The cycle closed if `resolution`, with `stack`, waited for `slot`
    fn cycle_through(
        &self,
        resolution: u64,
        slot: u64,
        stack: &[CapabilityKey],
    ) -> Option<Vec<CapabilityKey>> {
        let mut cycle = stack.to_vec();
        let mut wanted = slot;

        // A resolution waits on at most one slot, so a loop visits each waiter once
        for _ in 0..=self.waiting.len() {
            let owner = *self.owners.get(&wanted)?;
            if owner == resolution {
                let closing = cycle.last()?.clone();
                let start = cycle.iter().position(|key| *key == closing)?;
                return Some(cycle.split_off(start));
            }

            let waiting = self.waiting.get(&owner)?;
            let held = cycle.last()?.clone();
            let position = waiting.stack.iter().position(|key| *key == held)?;
            cycle.extend_from_slice(&waiting.stack[position + 1..]);
            wanted = waiting.slot;
        }

        None
    }
}

/// Which resolution owns each in-flight construction and which slot each blocked resolution awaits
#[derive(Debug, Default)]
pub(crate) struct ConstructionGraph {
    state: Mutex<GraphState>,
}

impl ConstructionGraph {
    fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `resolution` is about to block on `slot`, unless that would deadlock
    fn begin_wait(
        &self,
        resolution: u64,
        slot: u64,
        stack: Vec<CapabilityKey>,
    ) -> Result<(), ContainerError> {
        let mut state = self.state();
        if let Some(cycle) = state.cycle_through(resolution, slot, &stack) {
            tracing::debug!(
                chain = ?cycle.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "Circular dependency across concurrent resolutions"
            );
            return Err(ContainerError::CircularDependency { cycle });
        }

        state.waiting.insert(resolution, Waiting { slot, stack });
        Ok(())
    }

    fn acquired(&self, resolution: u64, slot: u64) {
        let mut state = self.state();
        state.waiting.remove(&resolution);
        state.owners.insert(slot, resolution);
    }

    fn released(&self, slot: u64) {
        self.state().owners.remove(&slot);
    }
}

/// Clears slot ownership when construction ends, including by unwinding
struct Ownership<'g> {
    graph: &'g ConstructionGraph,
    slot: u64,
}

impl Drop for Ownership<'_> {
    fn drop(&mut self) {
        self.graph.released(self.slot);
    }
}

/// Lazily populated, write-once-per-key instance cache
#[derive(Debug, Default)]
pub(crate) struct InstanceCache {
    slots: RwLock<HashMap<SlotKey, Arc<Slot>>>,
}

impl InstanceCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &SlotKey) -> Result<Arc<Slot>, ContainerError> {
        {
            let slots = self.slots.read().map_err(|_| ContainerError::LockError {
                resource: "instance_cache".to_string(),
            })?;
            if let Some(slot) = slots.get(key) {
                return Ok(slot.clone());
            }
        }

        let mut slots = self.slots.write().map_err(|_| ContainerError::LockError {
            resource: "instance_cache".to_string(),
        })?;
        Ok(slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone())
    }

    /// Return the cached instance for `key` or construct it exactly once
    ///
    /// Only factory failures are memoized: errors computed from the caller's
    /// own chain or scope (depth, cycles, missing scopes) are returned without
    /// touching the slot.
    pub(crate) fn get_or_construct<F>(
        &self,
        graph: &ConstructionGraph,
        key: &SlotKey,
        policy: FailurePolicy,
        ctx: &ResolutionContext<'_>,
        construct: F,
    ) -> Result<Instance, ContainerError>
    where
        F: FnOnce() -> Result<Instance, ContainerError>,
    {
        let slot = self.slot(key)?;
        if let Some(instance) = slot.ready.get() {
            return Ok(instance.clone());
        }

        // A panicking factory poisons the mutex but never fills the slot
        let mut failure = match slot.construction.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                graph.begin_wait(ctx.id(), slot.id, ctx.stack())?;
                slot.construction
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
            }
        };
        graph.acquired(ctx.id(), slot.id);
        let _ownership = Ownership {
            graph,
            slot: slot.id,
        };

        if let Some(instance) = slot.ready.get() {
            return Ok(instance.clone());
        }
        if let Some(error) = failure.as_ref() {
            tracing::trace!(key = %key.key(), "Replaying memoized construction failure");
            return Err(error.clone());
        }

        match construct() {
            Ok(instance) => {
                let stored = slot.ready.get_or_init(|| instance);
                Ok(stored.clone())
            }
            Err(error) => {
                if policy == FailurePolicy::Memoize && error.is_factory_failure() {
                    *failure = Some(error.clone());
                }
                Err(error)
            }
        }
    }

    pub(crate) fn get(&self, key: &SlotKey) -> Option<Instance> {
        let slots = self.slots.read().ok()?;
        slots.get(key)?.ready.get().cloned()
    }

    /// Number of fully constructed instances
    pub(crate) fn len(&self) -> usize {
        self.slots
            .read()
            .map(|slots| slots.values().filter(|slot| slot.ready.get().is_some()).count())
            .unwrap_or(0)
    }
}

/// Decides whether to reuse a cached instance or construct a new one
#[derive(Debug)]
pub(crate) struct LifecycleManager {
    singletons: InstanceCache,
    scopes: ScopeRegistry,
    graph: ConstructionGraph,
    policy: FailurePolicy,
}

impl LifecycleManager {
    pub(crate) fn new(policy: FailurePolicy) -> Self {
        Self {
            singletons: InstanceCache::new(),
            scopes: ScopeRegistry::new(),
            graph: ConstructionGraph::default(),
            policy,
        }
    }

    pub(crate) fn obtain(
        &self,
        slot: &SlotKey,
        lifetime: Lifetime,
        factory: &Factory,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Instance, ContainerError> {
        let construct = || {
            tracing::debug!(key = %slot.key(), lifetime = %lifetime, "Constructing instance");
            factory.invoke(ctx)
        };

        match lifetime {
            Lifetime::Transient => construct(),
            Lifetime::Singleton => {
                self.singletons
                    .get_or_construct(&self.graph, slot, self.policy, ctx, construct)
            }
            Lifetime::Scoped => {
                let handle = ctx.scope().ok_or_else(|| ContainerError::ScopeRequired {
                    key: slot.key().clone(),
                })?;
                let cache = self.scopes.cache(handle)?;
                cache.get_or_construct(&self.graph, slot, self.policy, ctx, construct)
            }
        }
    }

    pub(crate) fn singleton(&self, slot: &SlotKey) -> Option<Instance> {
        self.singletons.get(slot)
    }

    pub(crate) fn begin_scope(&self) -> Result<ScopeHandle, ContainerError> {
        self.scopes.begin()
    }

    pub(crate) fn end_scope(&self, handle: &ScopeHandle) -> Result<(), ContainerError> {
        self.scopes.end(handle)
    }

    pub(crate) fn cached_singletons(&self) -> usize {
        self.singletons.len()
    }

    pub(crate) fn active_scopes(&self) -> usize {
        self.scopes.active_count()
    }
}
