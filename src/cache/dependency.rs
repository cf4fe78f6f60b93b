//! Template ↔ watched-file dependency graph.
//!
//! Forward: template → files whose change invalidates it (imports).
//! Reverse: file → templates that depend on it.

use rustc_hash::{FxHashMap, FxHashSet};

type PathSet = FxHashSet<String>;
type PathSetMap = FxHashMap<String, PathSet>;

/// Bidirectional dependency graph keyed by logical path.
///
/// # Invariants
/// - Forward and reverse mappings are always consistent
/// - Self-references are excluded
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: PathSetMap,
    reverse: PathSetMap,
}

impl DependencyGraph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dependencies of a template, replacing previous ones.
    pub fn record(&mut self, template: &str, dependencies: &[&str]) {
        self.remove(template);

        let deps: PathSet = dependencies
            .iter()
            .filter(|dep| **dep != template)
            .map(|dep| dep.to_string())
            .collect();

        for dep in &deps {
            self.reverse
                .entry(dep.clone())
                .or_default()
                .insert(template.to_string());
        }
        self.forward.insert(template.to_string(), deps);
    }

    /// Templates depending on `file`.
    #[inline]
    pub fn used_by(&self, file: &str) -> Option<&PathSet> {
        self.reverse.get(file)
    }

    #[inline]
    pub fn contains(&self, template: &str) -> bool {
        self.forward.contains_key(template)
    }

    /// Remove a template and clean up its reverse mappings.
    pub fn remove(&mut self, template: &str) {
        let Some(old_deps) = self.forward.remove(template) else {
            return;
        };

        for dep in old_deps {
            if let Some(dependents) = self.reverse.get_mut(&dep) {
                dependents.remove(template);
                if dependents.is_empty() {
                    self.reverse.remove(&dep);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query() {
        let mut graph = DependencyGraph::new();
        graph.record("/Views/Home/Index.cshtml", &["/Views/Home/Index.cshtml", "/_ViewImports.cshtml", "/Views/_ViewImports.cshtml"]);
        graph.record("/Views/About.cshtml", &["/_ViewImports.cshtml"]);

        let users = graph.used_by("/_ViewImports.cshtml").unwrap();
        assert_eq!(users.len(), 2);
        assert!(graph.used_by("/Views/Home/Index.cshtml").is_none());
        assert!(graph.contains("/Views/Home/Index.cshtml"));
    }

    #[test]
    fn test_record_replaces() {
        let mut graph = DependencyGraph::new();
        graph.record("/a.cshtml", &["/_ViewImports.cshtml"]);
        graph.record("/a.cshtml", &["/Other/_ViewImports.cshtml"]);

        assert!(graph.used_by("/_ViewImports.cshtml").is_none());
        assert!(graph.used_by("/Other/_ViewImports.cshtml").unwrap().contains("/a.cshtml"));
    }

    #[test]
    fn test_remove() {
        let mut graph = DependencyGraph::new();
        graph.record("/a.cshtml", &["/x"]);
        graph.record("/b.cshtml", &["/x"]);

        graph.remove("/a.cshtml");
        assert!(!graph.contains("/a.cshtml"));
        assert_eq!(graph.used_by("/x").unwrap().len(), 1);

        graph.remove("/b.cshtml");
        assert!(graph.used_by("/x").is_none());
    }
}
