//! Discovery sessions.
//!
//! A [`Discovery`] owns everything that outlives a single lookup: the search
//! roots dotted module names are resolved against, and the registry of
//! modules that were already loaded. Loading the same dotted name twice in a
//! session returns the cached handle.

use std::collections::BTreeMap;

use crate::loader::Module;
use crate::source::SearchRoots;

/// State shared by the discovery operations of one session.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub(crate) roots: SearchRoots,
    pub(crate) registry: BTreeMap<String, Module>,
}

impl Discovery {
    /// Create a session with no search roots and no loaded modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session that resolves module names against the given roots.
    pub fn with_roots(roots: SearchRoots) -> Self {
        Self {
            roots,
            registry: BTreeMap::new(),
        }
    }

    /// The search roots, highest priority first.
    pub fn search_roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Mutable access to the search roots.
    pub fn search_roots_mut(&mut self) -> &mut SearchRoots {
        &mut self.roots
    }

    /// Look up an already loaded module by dotted name.
    pub fn loaded(&self, name: &str) -> Option<&Module> {
        self.registry.get(name)
    }

    /// All modules loaded so far, sorted by dotted name.
    pub fn loaded_modules(&self) -> impl Iterator<Item = &Module> {
        self.registry.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn create_two_roots(dir: &Path) -> (PathBuf, PathBuf) {
        let first = dir.join("first");
        let second = dir.join("second");
        for (root, value) in [(&first, "1"), (&second, "2")] {
            fs::create_dir_all(root.join("shared")).unwrap();
            fs::write(root.join("shared/__init__.py"), "").unwrap();
            fs::write(root.join("shared/config.py"), format!("ORIGIN = {}\n", value)).unwrap();
        }
        (first, second)
    }

    #[test]
    fn test_with_roots_imports_without_discovery() {
        let temp = tempdir().unwrap();
        let (first, second) = create_two_roots(temp.path());
        let mut discovery = Discovery::with_roots(SearchRoots::from_iter([first, second]));

        let config = discovery.import_module("shared.config").unwrap();

        assert_eq!(config.getattr("ORIGIN"), Some(&crate::Value::Int(1)));
        assert_eq!(discovery.search_roots().len(), 2);
        assert_eq!(discovery.loaded_modules().count(), 1);
    }

    #[test]
    fn test_registered_root_takes_priority() {
        let temp = tempdir().unwrap();
        let (first, second) = create_two_roots(temp.path());
        let mut discovery = Discovery::with_roots(SearchRoots::from_iter([first]));

        assert!(discovery.search_roots_mut().register(second.clone()));
        let config = discovery.import_module("shared.config").unwrap();

        assert_eq!(config.getattr("ORIGIN"), Some(&crate::Value::Int(2)));
        assert_eq!(discovery.search_roots().iter().next(), Some(second.as_path()));
    }

    #[test]
    fn test_new_session_has_nothing_loaded() {
        let discovery = Discovery::new();

        assert!(discovery.search_roots().is_empty());
        assert!(discovery.loaded("anything").is_none());
    }
}
