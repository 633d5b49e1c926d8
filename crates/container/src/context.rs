use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::container::Container;
use crate::errors::ContainerError;
use crate::key::CapabilityKey;
use crate::scope::ScopeHandle;

static NEXT_RESOLUTION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-resolution state shared by a root request and all of its nested resolutions
///
/// Factories receive the context of the resolution that invoked them and
/// resolve their own dependencies through it (see [`crate::Resolver`]), so
/// cycle detection and contextual overrides span the whole call graph.
pub struct ResolutionContext<'c> {
    pub(crate) container: &'c Container,
    id: u64,
    scope: Option<ScopeHandle>,
    stack: RefCell<Vec<CapabilityKey>>,
}

impl<'c> ResolutionContext<'c> {
    pub(crate) fn new(container: &'c Container, scope: Option<ScopeHandle>) -> Self {
        Self {
            container,
            id: NEXT_RESOLUTION_ID.fetch_add(1, Ordering::Relaxed),
            scope,
            stack: RefCell::new(Vec::new()),
        }
    }

    /// Keys currently being constructed, outermost first
    pub fn stack(&self) -> Vec<CapabilityKey> {
        self.stack.borrow().clone()
    }

    /// The key currently being constructed, if any
    pub fn consumer(&self) -> Option<CapabilityKey> {
        self.stack.borrow().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Scope this resolution runs in
    pub fn scope(&self) -> Option<&ScopeHandle> {
        self.scope.as_ref()
    }

    /// Identity of this root resolution among concurrent ones
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_constructing(&self, key: &CapabilityKey) -> bool {
        self.stack.borrow().contains(key)
    }

    /// The cycle closed by requesting `key` again, starting at its first occurrence
    pub(crate) fn cycle_to(&self, key: &CapabilityKey) -> Vec<CapabilityKey> {
        let stack = self.stack.borrow();
        let start = stack.iter().position(|k| k == key).unwrap_or(0);
        let mut cycle = stack[start..].to_vec();
        cycle.push(key.clone());
        cycle
    }

    /// Push `key` onto the resolution stack for the lifetime of the returned frame
    pub(crate) fn enter(&self, key: &CapabilityKey) -> Result<StackFrame<'_, 'c>, ContainerError> {
        let limit = self.container.config().max_depth;
        let mut stack = self.stack.borrow_mut();
        if stack.len() >= limit {
            let mut chain = stack.clone();
            chain.push(key.clone());
            return Err(ContainerError::ResolutionDepthExceeded { limit, chain });
        }

        stack.push(key.clone());
        Ok(StackFrame { ctx: self })
    }
}

impl std::fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("stack", &self.stack.borrow())
            .finish()
    }
}

/// Pops its key when dropped, whether construction succeeded, failed or unwound
pub(crate) struct StackFrame<'a, 'c> {
    ctx: &'a ResolutionContext<'c>,
}

impl Drop for StackFrame<'_, '_> {
    fn drop(&mut self) {
        self.ctx.stack.borrow_mut().pop();
    }
}
