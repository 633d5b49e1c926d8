use std::collections::HashMap;

use crate::binding::BindingRegistry;
use crate::errors::ContainerError;
use crate::key::CapabilityKey;
use crate::overrides::ContextualOverrideTable;

/// Dependency graph node
#[derive(Debug)]
struct DependencyNode {
    key: CapabilityKey,
    /// Declared dependencies that are not satisfied by a contextual override
    dependencies: Vec<CapabilityKey>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Graph of declared dependencies between bindings
///
/// Only dependencies declared on bindings are known here; what a factory
/// resolves at runtime is still checked by the resolution engine. Nodes and
/// edges keep registration order so results are reproducible.
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<CapabilityKey, usize>,
}

impl DependencyGraph {
    /// Build the graph from bindings, dropping edges served by a contextual override
    pub fn build(registry: &BindingRegistry, overrides: &ContextualOverrideTable) -> Self {
        let mut nodes = Vec::with_capacity(registry.len());
        let mut index = HashMap::with_capacity(registry.len());

        for binding in registry.bindings() {
            let dependencies = binding
                .dependencies
                .iter()
                .filter(|dependency| overrides.lookup(&binding.key, dependency).is_none())
                .cloned()
                .collect();

            index.insert(binding.key.clone(), nodes.len());
            nodes.push(DependencyNode {
                key: binding.key.clone(),
                dependencies,
            });
        }

        Self { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Report the first cycle, then the first missing dependency
    pub fn validate(&self) -> Result<(), ContainerError> {
        self.topological_order()?;

        for node in &self.nodes {
            for dependency in &node.dependencies {
                if !self.index.contains_key(dependency) {
                    return Err(ContainerError::unresolvable(
                        dependency.clone(),
                        vec![node.key.clone()],
                    ));
                }
            }
        }

        Ok(())
    }

    /// Keys ordered so that every binding comes after its dependencies
    pub fn topological_order(&self) -> Result<Vec<CapabilityKey>, ContainerError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for start in 0..self.nodes.len() {
            self.visit(start, &mut marks, &mut path, &mut order)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<CapabilityKey>,
    ) -> Result<(), ContainerError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|&n| n == node).unwrap_or(0);
                let mut cycle: Vec<CapabilityKey> = path[start..]
                    .iter()
                    .map(|&n| self.nodes[n].key.clone())
                    .collect();
                cycle.push(self.nodes[node].key.clone());
                return Err(ContainerError::CircularDependency { cycle });
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::InProgress;
        path.push(node);

        for dependency in &self.nodes[node].dependencies {
            // Missing dependencies are leaves here and reported by `validate`
            if let Some(&next) = self.index.get(dependency) {
                self.visit(next, marks, path, order)?;
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        order.push(self.nodes[node].key.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Binding, Factory};
    use crate::lifetime::Lifetime;
    use crate::overrides::ContextualOverride;

    struct A;
    struct B;
    struct C;
    struct D;

    fn binding<T: Send + Sync + 'static>(value: fn() -> T) -> Binding {
        Binding::new(
            CapabilityKey::of::<T>(),
            Factory::new(move |_| Ok(value())),
            Lifetime::Transient,
        )
    }

    #[test]
    fn test_topological_order_puts_dependencies_first() {
        let mut registry = BindingRegistry::new();
        registry
            .register(binding(|| A).depends_on(CapabilityKey::of::<B>()))
            .unwrap();
        registry
            .register(binding(|| B).depends_on(CapabilityKey::of::<C>()))
            .unwrap();
        registry.register(binding(|| C)).unwrap();

        let graph = DependencyGraph::build(&registry, &ContextualOverrideTable::new());
        let order = graph.topological_order().unwrap();

        assert_eq!(
            order,
            vec![
                CapabilityKey::of::<C>(),
                CapabilityKey::of::<B>(),
                CapabilityKey::of::<A>(),
            ]
        );
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_cycle_is_reported_in_registration_order() {
        let mut registry = BindingRegistry::new();
        registry
            .register(binding(|| A).depends_on(CapabilityKey::of::<B>()))
            .unwrap();
        registry
            .register(binding(|| B).depends_on(CapabilityKey::of::<A>()))
            .unwrap();

        let graph = DependencyGraph::build(&registry, &ContextualOverrideTable::new());

        for _ in 0..5 {
            match graph.validate() {
                Err(ContainerError::CircularDependency { cycle }) => assert_eq!(
                    cycle,
                    vec![
                        CapabilityKey::of::<A>(),
                        CapabilityKey::of::<B>(),
                        CapabilityKey::of::<A>(),
                    ]
                ),
                other => panic!("expected a cycle, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_declared_dependency() {
        let mut registry = BindingRegistry::new();
        registry
            .register(binding(|| A).depends_on(CapabilityKey::of::<D>()))
            .unwrap();

        let graph = DependencyGraph::build(&registry, &ContextualOverrideTable::new());
        match graph.validate() {
            Err(ContainerError::UnresolvableBinding { key, chain }) => {
                assert_eq!(key, CapabilityKey::of::<D>());
                assert_eq!(chain, vec![CapabilityKey::of::<A>()]);
            }
            other => panic!("expected a missing binding, got {:?}", other),
        }
    }

    #[test]
    fn test_override_satisfies_declared_dependency() {
        let mut registry = BindingRegistry::new();
        registry
            .register(binding(|| A).depends_on(CapabilityKey::of::<D>()))
            .unwrap();

        let mut overrides = ContextualOverrideTable::new();
        overrides
            .insert(ContextualOverride {
                consumer: CapabilityKey::of::<A>(),
                dependency: CapabilityKey::of::<D>(),
                factory: Factory::new(|_| Ok(D)),
                lifetime: Lifetime::Transient,
            })
            .unwrap();

        let graph = DependencyGraph::build(&registry, &overrides);
        assert!(graph.validate().is_ok());
        assert_eq!(graph.len(), 1);
    }
}
