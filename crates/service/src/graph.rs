use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, OnceLock};

use helix_discovery::Discovery;
use tracing::debug;

use crate::descriptor::ServiceDescriptor;
use crate::error::{Error, Result};
use crate::handle::{ServiceFactory, ServiceRole};
use crate::registry::ServiceRegistry;

/// One node of the resolved service graph.
pub struct ServiceNode {
    descriptor: ServiceDescriptor,
    factory: Arc<dyn ServiceFactory>,
    runtime: OnceLock<Arc<dyn Discovery>>,
}

impl ServiceNode {
    fn new(descriptor: ServiceDescriptor, factory: Arc<dyn ServiceFactory>) -> Self {
        Self {
            descriptor,
            factory,
            runtime: OnceLock::new(),
        }
    }

    /// The node's descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// The node's instance factory.
    #[must_use]
    pub fn factory(&self) -> Arc<dyn ServiceFactory> {
        self.factory.clone()
    }

    /// Injects the coordination-backend handle. The first injection wins;
    /// later calls are no-ops, so every dependent observes the same handle.
    pub fn bind_runtime(&self, runtime: Arc<dyn Discovery>) {
        let _ = self.runtime.set(runtime);
    }

    /// The injected backend handle, once the registrar has run.
    #[must_use]
    pub fn runtime(&self) -> Option<Arc<dyn Discovery>> {
        self.runtime.get().cloned()
    }
}

impl std::fmt::Debug for ServiceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceNode")
            .field("descriptor", &self.descriptor)
            .field("runtime_bound", &self.runtime.get().is_some())
            .finish_non_exhaustive()
    }
}

/// The dependency graph resolved for one worker process, rooted at the
/// entry node the process serves.
#[derive(Debug)]
pub struct ServiceGraph {
    entry: String,
    role: ServiceRole,
    nodes: BTreeMap<String, Arc<ServiceNode>>,
}

impl ServiceGraph {
    /// The entry node this process serves.
    ///
    /// # Panics
    ///
    /// Never panics: the loader guarantees the entry is present and pruning
    /// keeps it.
    #[must_use]
    pub fn entry(&self) -> &Arc<ServiceNode> {
        self.nodes
            .get(&self.entry)
            .expect("entry node is retained by construction")
    }

    /// Whether the entry is the located root or an override-selected
    /// dependency.
    #[must_use]
    pub const fn role(&self) -> ServiceRole {
        self.role
    }

    /// Looks up a node by service name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Arc<ServiceNode>> {
        self.nodes.get(name)
    }

    /// All retained nodes, by name.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<ServiceNode>> {
        self.nodes.values()
    }

    /// All retained nodes except the entry: the dependency nodes the
    /// registrar injects the backend handle into.
    pub fn dependency_nodes(&self) -> impl Iterator<Item = &Arc<ServiceNode>> {
        let entry = self.entry.clone();
        self.nodes
            .iter()
            .filter(move |(name, _)| **name != entry)
            .map(|(_, node)| node)
    }

    /// Number of retained nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node the entry point's dependency closure does not
    /// reference. Idempotent: pruning an already-pruned graph is a no-op.
    pub fn prune(&mut self) {
        let reachable = self.reachable_from_entry();
        let before = self.nodes.len();
        self.nodes.retain(|name, _| reachable.contains(name));
        let removed = before - self.nodes.len();
        if removed > 0 {
            debug!(removed, "pruned unreferenced service graph nodes");
        }
    }

    fn reachable_from_entry(&self) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        let mut queue = VecDeque::from([self.entry.clone()]);
        while let Some(name) = queue.pop_front() {
            if !reachable.insert(name.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&name) {
                for dep in node.descriptor().dependencies() {
                    queue.push_back(dep.clone());
                }
            }
        }
        reachable
    }
}

/// Resolves a service locator (plus optional name override) against a
/// registry into a pruned [`ServiceGraph`].
#[derive(Debug)]
pub struct GraphLoader<'a> {
    registry: &'a ServiceRegistry,
}

impl<'a> GraphLoader<'a> {
    /// Creates a loader over the given registry.
    #[must_use]
    pub const fn new(registry: &'a ServiceRegistry) -> Self {
        Self { registry }
    }

    /// Loads the graph for `locator`. When `name_override` is set and
    /// differs from the located root, the override node becomes the entry;
    /// it must be reachable through the root's dependency edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the locator, the override node, or
    /// a declared dependency resolves to no registered service.
    pub fn load(&self, locator: &str, name_override: Option<&str>) -> Result<ServiceGraph> {
        let root = self.registry.resolve(locator)?;
        let root_name = root.descriptor().name().to_string();

        let mut nodes = BTreeMap::new();
        for definition in self.registry.definitions() {
            nodes.insert(
                definition.descriptor().name().to_string(),
                Arc::new(ServiceNode::new(
                    definition.descriptor().clone(),
                    definition.factory(),
                )),
            );
        }

        let (entry, role) = match name_override {
            Some(name) if name != root_name => {
                Self::find_dependent(&nodes, &root_name, name)?;
                (name.to_string(), ServiceRole::Dependency)
            }
            _ => (root_name, ServiceRole::Entry),
        };

        let mut graph = ServiceGraph { entry, role, nodes };

        // Declared edges must resolve before pruning hides the breakage.
        for name in graph.reachable_from_entry() {
            if !graph.nodes.contains_key(&name) {
                return Err(Error::NotFound { name });
            }
        }

        graph.prune();
        debug!(
            entry = graph.entry,
            nodes = graph.len(),
            "resolved service graph"
        );
        Ok(graph)
    }

    /// Locates `target` by walking dependency edges from `root`.
    fn find_dependent(
        nodes: &BTreeMap<String, Arc<ServiceNode>>,
        root: &str,
        target: &str,
    ) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([root.to_string()]);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if name == target {
                return Ok(());
            }
            if let Some(node) = nodes.get(&name) {
                for dep in node.descriptor().dependencies() {
                    queue.push_back(dep.clone());
                }
            }
        }
        Err(Error::NotFound {
            name: target.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{ServiceContext, ServiceHandle};

    #[derive(Debug)]
    struct NoopFactory;

    impl ServiceFactory for NoopFactory {
        fn instantiate(&self, _context: ServiceContext) -> Result<Arc<dyn ServiceHandle>> {
            Err(Error::Configuration("not instantiable".to_string()))
        }
    }

    fn registry_with(descriptors: Vec<ServiceDescriptor>) -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        for descriptor in descriptors {
            registry
                .register(descriptor, Arc::new(NoopFactory))
                .unwrap();
        }
        registry
    }

    #[test]
    fn pruning_drops_unreferenced_nodes_and_is_idempotent() {
        let registry = registry_with(vec![
            ServiceDescriptor::builder("root").depends_on("used").build(),
            ServiceDescriptor::builder("used").build(),
            ServiceDescriptor::builder("unused").build(),
        ]);

        let mut graph = GraphLoader::new(&registry).load(".", None).unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.node("unused").is_none());

        let names_once: Vec<String> = graph
            .nodes()
            .map(|n| n.descriptor().name().to_string())
            .collect();
        graph.prune();
        let names_twice: Vec<String> = graph
            .nodes()
            .map(|n| n.descriptor().name().to_string())
            .collect();
        assert_eq!(names_once, names_twice);
    }

    #[test]
    fn name_override_selects_a_dependency_node() {
        let registry = registry_with(vec![
            ServiceDescriptor::builder("root").depends_on("mid").build(),
            ServiceDescriptor::builder("mid").depends_on("leaf").build(),
            ServiceDescriptor::builder("leaf").build(),
        ]);

        let graph = GraphLoader::new(&registry)
            .load(".", Some("leaf"))
            .unwrap();
        assert_eq!(graph.entry().descriptor().name(), "leaf");
        assert_eq!(graph.role(), ServiceRole::Dependency);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn unknown_override_is_not_found() {
        let registry = registry_with(vec![ServiceDescriptor::builder("root").build()]);

        let result = GraphLoader::new(&registry).load(".", Some("ghost"));
        assert!(matches!(result, Err(Error::NotFound { name }) if name == "ghost"));
    }

    #[test]
    fn override_matching_root_keeps_entry_role() {
        let registry = registry_with(vec![ServiceDescriptor::builder("root").build()]);

        let graph = GraphLoader::new(&registry)
            .load(".", Some("root"))
            .unwrap();
        assert_eq!(graph.role(), ServiceRole::Entry);
    }

    #[test]
    fn dangling_dependency_edge_is_not_found() {
        let registry =
            registry_with(vec![ServiceDescriptor::builder("root").depends_on("ghost").build()]);

        let result = GraphLoader::new(&registry).load(".", None);
        assert!(matches!(result, Err(Error::NotFound { name }) if name == "ghost"));
    }

    #[test]
    fn runtime_injection_is_first_write_wins() {
        let registry = registry_with(vec![ServiceDescriptor::builder("root").build()]);
        let graph = GraphLoader::new(&registry).load(".", None).unwrap();
        assert!(graph.entry().runtime().is_none());
    }
}
