use std::collections::HashMap;

use crate::binding::Factory;
use crate::errors::ContainerError;
use crate::key::CapabilityKey;
use crate::lifetime::Lifetime;

/// Binding that applies only when `consumer` is being constructed and requests `dependency`
#[derive(Debug, Clone)]
pub struct ContextualOverride {
    pub consumer: CapabilityKey,
    pub dependency: CapabilityKey,
    pub factory: Factory,
    pub lifetime: Lifetime,
}

/// Per-consumer overrides, matched exactly on `(consumer, dependency)`
#[derive(Debug, Default)]
pub struct ContextualOverrideTable {
    /// consumer -> dependency -> override
    overrides: HashMap<CapabilityKey, HashMap<CapabilityKey, ContextualOverride>>,
    sealed: bool,
}

impl ContextualOverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the override for its `(consumer, dependency)` pair
    pub fn insert(&mut self, entry: ContextualOverride) -> Result<(), ContainerError> {
        if self.sealed {
            return Err(ContainerError::registration_after_seal(format!(
                "{} when building {}",
                entry.dependency, entry.consumer
            )));
        }

        let consumer = entry.consumer.clone();
        let dependency = entry.dependency.clone();
        let previous = self
            .overrides
            .entry(consumer.clone())
            .or_default()
            .insert(dependency.clone(), entry);

        if previous.is_some() {
            tracing::debug!(
                consumer = %consumer,
                dependency = %dependency,
                "Replacing existing contextual override"
            );
        }
        Ok(())
    }

    pub fn lookup(
        &self,
        consumer: &CapabilityKey,
        dependency: &CapabilityKey,
    ) -> Option<&ContextualOverride> {
        self.overrides.get(consumer)?.get(dependency)
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.overrides.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReportController;
    struct AuditController;
    struct Storage;

    fn storage_override<C: 'static>() -> ContextualOverride {
        ContextualOverride {
            consumer: CapabilityKey::of::<C>(),
            dependency: CapabilityKey::of::<Storage>(),
            factory: Factory::new(|_| Ok(Storage)),
            lifetime: Lifetime::Transient,
        }
    }

    #[test]
    fn test_lookup_is_exact_match() {
        let mut table = ContextualOverrideTable::new();
        table.insert(storage_override::<ReportController>()).unwrap();

        let storage = CapabilityKey::of::<Storage>();
        assert!(table.lookup(&CapabilityKey::of::<ReportController>(), &storage).is_some());
        assert!(table.lookup(&CapabilityKey::of::<AuditController>(), &storage).is_none());
        assert!(table
            .lookup(&CapabilityKey::of::<ReportController>(), &CapabilityKey::of::<String>())
            .is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_after_seal_fails() {
        let mut table = ContextualOverrideTable::new();
        table.seal();

        let result = table.insert(storage_override::<AuditController>());
        assert!(matches!(result, Err(ContainerError::RegistrationAfterSeal { .. })));
        assert!(table.is_empty());
    }
}
