use std::collections::{BTreeMap, BTreeSet, HashSet};

use parking_lot::RwLock;
use thiserror::Error;

use crate::store::BeanDefinitionStore;

/// Graph of the beans in a container.
///
/// Static `depends_on` edges are checked when the container is built.
/// Injection edges are recorded as beans are created and answer
/// [`Container::dependencies_of`](crate::container::Container::dependencies_of).
pub struct DependencyGraph {
    map: BTreeMap<String, DependencyGraphEntry>,
    injected: RwLock<InjectedEdges>,
}

#[derive(Default)]
struct InjectedEdges {
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

struct DependencyGraphEntry {
    name: String,
    depends_on: Vec<String>,
}

impl DependencyGraph {
    pub fn new(store: &BeanDefinitionStore) -> Self {
        let map = store
            .iter()
            .map(|bean| {
                let depends_on = bean
                    .definition
                    .depends_on()
                    .iter()
                    .map(|dependency| store.canonical_name(dependency).to_string())
                    .collect();
                let entry = DependencyGraphEntry {
                    name: bean.name.clone(),
                    depends_on,
                };
                (bean.name.clone(), entry)
            })
            .collect();

        DependencyGraph {
            map,
            injected: RwLock::new(InjectedEdges::default()),
        }
    }

    /// Validate the `depends_on` declarations
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for entry in self.map.values() {
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse<'g>(
            graph: &'g DependencyGraph,
            checked: &mut HashSet<&'g str>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'g str>,
            entry: &'g DependencyGraphEntry,
        ) {
            if let Some(start) = dependency_chain.iter().position(|n| *n == entry.name) {
                let mut chain: Vec<String> =
                    dependency_chain[start..].iter().map(|n| n.to_string()).collect();
                chain.push(entry.name.clone());
                errors.push(DependencyGraphError::CircularDependsOn { chain });
                return;
            }

            // Skip other checks if already checked
            if !checked.insert(&entry.name) {
                return;
            };

            dependency_chain.push(&entry.name);

            for dependency in &entry.depends_on {
                let Some(next_entry) = graph.map.get(dependency) else {
                    errors.push(DependencyGraphError::MissingDependency {
                        dependency: dependency.clone(),
                        required_by: entry.name.clone(),
                    });
                    continue;
                };

                check_recurse(graph, checked, errors, dependency_chain, next_entry);
            }

            dependency_chain.pop();
        }
    }

    /// Records that `dependent` received `dependency` through injection or `depends_on`
    pub(crate) fn record(&self, edges: &[(String, String)]) {
        if edges.is_empty() {
            return;
        }
        let mut injected = self.injected.write();
        for (dependent, dependency) in edges {
            injected
                .dependencies
                .entry(dependent.clone())
                .or_default()
                .insert(dependency.clone());
            injected
                .dependents
                .entry(dependency.clone())
                .or_default()
                .insert(dependent.clone());
        }
    }

    /// Names `name` was injected with, sorted
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        let injected = self.injected.read();
        injected
            .dependencies
            .get(name)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Names that were injected with `name`, sorted
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let injected = self.injected.read();
        injected
            .dependents
            .get(name)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("'{required_by}' depends on '{dependency}' but it is missing")]
    MissingDependency {
        dependency: String,
        required_by: String,
    },
    #[error("Circular depends-on relationship: {}", .chain.join(" -> "))]
    CircularDependsOn { chain: Vec<String> },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
