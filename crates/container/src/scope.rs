use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::errors::ContainerError;
use crate::lifecycle::InstanceCache;

/// Handle identifying an active scope (e.g., one per request)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeHandle {
    id: Uuid,
}

impl ScopeHandle {
    fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Display for ScopeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.id)
    }
}

/// Active scopes and their instance caches
#[derive(Debug, Default)]
pub(crate) struct ScopeRegistry {
    scopes: RwLock<HashMap<ScopeHandle, Arc<InstanceCache>>>,
}

impl ScopeRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&self) -> Result<ScopeHandle, ContainerError> {
        let handle = ScopeHandle::new();
        let mut scopes = self.scopes.write().map_err(|_| ContainerError::LockError {
            resource: "scopes".to_string(),
        })?;

        scopes.insert(handle.clone(), Arc::new(InstanceCache::new()));
        tracing::debug!(scope = %handle, "Scope started");
        Ok(handle)
    }

    /// Remove the scope; its cached instances are dropped once in-flight resolutions finish
    pub(crate) fn end(&self, handle: &ScopeHandle) -> Result<(), ContainerError> {
        let removed = {
            let mut scopes = self.scopes.write().map_err(|_| ContainerError::LockError {
                resource: "scopes".to_string(),
            })?;
            scopes.remove(handle)
        };

        match removed {
            Some(cache) => {
                tracing::debug!(scope = %handle, discarded = cache.len(), "Scope ended");
                Ok(())
            }
            None => Err(ContainerError::ScopeNotFound {
                scope: handle.to_string(),
            }),
        }
    }

    /// Cache for an active scope. The registry lock is released before returning.
    pub(crate) fn cache(&self, handle: &ScopeHandle) -> Result<Arc<InstanceCache>, ContainerError> {
        let scopes = self.scopes.read().map_err(|_| ContainerError::LockError {
            resource: "scopes".to_string(),
        })?;

        scopes
            .get(handle)
            .cloned()
            .ok_or_else(|| ContainerError::ScopeNotFound {
                scope: handle.to_string(),
            })
    }

    pub(crate) fn active_count(&self) -> usize {
        self.scopes.read().map(|scopes| scopes.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_and_end_scope() {
        let registry = ScopeRegistry::new();
        let first = registry.begin().unwrap();
        let second = registry.begin().unwrap();

        assert_ne!(first, second);
        assert_eq!(registry.active_count(), 2);
        assert!(registry.cache(&first).is_ok());

        registry.end(&first).unwrap();
        assert_eq!(registry.active_count(), 1);
        assert!(matches!(
            registry.cache(&first),
            Err(ContainerError::ScopeNotFound { .. })
        ));
    }

    #[test]
    fn test_end_unknown_scope_fails() {
        let registry = ScopeRegistry::new();
        let handle = registry.begin().unwrap();
        registry.end(&handle).unwrap();

        assert!(matches!(
            registry.end(&handle),
            Err(ContainerError::ScopeNotFound { .. })
        ));
        assert!(handle.to_string().starts_with("scope-"));
    }
}
