//! Path matching with glob patterns.
//!
//! Matching a root directory also registers it as a search root of the
//! session, so modules found below it can be loaded by dotted name
//! afterwards.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::error::DiscoverError;
use crate::session::Discovery;
use crate::Result;

/// Directories that dotted module names are resolved against.
///
/// Roots are kept in priority order: the most recently registered root is
/// tried first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRoots {
    roots: Vec<PathBuf>,
}

impl SearchRoots {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root with the highest priority.
    ///
    /// A root that is already present moves to the front. Returns `true` if
    /// the root was not registered before.
    pub fn register(&mut self, root: impl Into<PathBuf>) -> bool {
        let root = root.into();
        let existed = match self.roots.iter().position(|r| *r == root) {
            Some(index) => {
                self.roots.remove(index);
                true
            }
            None => false,
        };
        self.roots.insert(0, root);
        !existed
    }

    /// Whether the root is registered.
    pub fn contains(&self, root: &Path) -> bool {
        self.roots.iter().any(|r| r == root)
    }

    /// Iterate roots, highest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|p| p.as_path())
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl FromIterator<PathBuf> for SearchRoots {
    /// Build from a caller-supplied list, first item has the highest priority.
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();
        for root in iter {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        Self { roots }
    }
}

/// Match options that follow the shell convention: wildcards never match a
/// leading dot.
fn match_options() -> MatchOptions {
    MatchOptions {
        require_literal_separator: true,
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    }
}

/// Reject paths that carry no location at all.
pub(crate) fn checked_dir(dir: &Path) -> Result<&Path> {
    if dir.as_os_str().is_empty() {
        return Err(DiscoverError::invalid(
            "an empty path is not a valid directory, provide a path or a string",
        ));
    }
    Ok(dir)
}

/// Absolute form of a path, without requiring it to exist.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Whether a relative path stays below its base.
fn stays_inside(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// `root` without `.` components, which `glob` leaves out of its results.
fn without_cur_dir(root: &Path) -> PathBuf {
    root.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Return the sorted paths below `root` matching `pattern`.
///
/// Does not touch any session state.
pub fn matching_paths(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let root = checked_dir(root)?;
    let plain_root = without_cur_dir(root);

    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let full_pattern = Path::new(&escaped_root).join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let entries = glob::glob_with(&full_pattern, match_options()).map_err(|e| {
        DiscoverError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        }
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            match path.strip_prefix(root).or_else(|_| path.strip_prefix(&plain_root)) {
                Ok(relative) => stays_inside(relative),
                Err(_) => false,
            }
        })
        .collect();

    // Sort for deterministic output
    paths.sort();
    paths.dedup();

    Ok(paths)
}

impl Discovery {
    /// Return the sorted paths below `root` matching `pattern`.
    ///
    /// `pattern` may use `**` to match any number of directories. The
    /// absolute form of `root` is registered as a search root of this
    /// session.
    pub fn discover_paths(
        &mut self,
        root: impl AsRef<Path>,
        pattern: &str,
    ) -> Result<Vec<PathBuf>> {
        let root = root.as_ref();
        let paths = matching_paths(root, pattern)?;
        self.register_root(absolute(root));
        Ok(paths)
    }

    pub(crate) fn register_root(&mut self, root: PathBuf) {
        let shown = root.display().to_string();
        if self.roots.register(root) {
            debug!(root = %shown, "registered search root");
        }
    }
}

/// Return the sorted paths below `root` matching `pattern`.
///
/// Runs on a fresh [`Discovery`]; use [`Discovery::discover_paths`] to keep
/// the registered search root.
pub fn discover_paths(root: impl AsRef<Path>, pattern: &str) -> Result<Vec<PathBuf>> {
    Discovery::new().discover_paths(root, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_files(dir: &Path) {
        fs::create_dir_all(dir.join("pkg/sub")).unwrap();

        fs::write(dir.join("pkg/__init__.py"), "").unwrap();
        fs::write(dir.join("pkg/a.py"), "A = 1").unwrap();
        fs::write(dir.join("pkg/sub/__init__.py"), "").unwrap();
        fs::write(dir.join("pkg/sub/b.py"), "B = 2").unwrap();
        fs::write(dir.join("pkg/notes.txt"), "notes").unwrap();
    }

    #[test]
    fn test_recursive_pattern() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let paths = discover_paths(temp.path(), "**/*.py").unwrap();

        assert_eq!(paths.len(), 4);
        assert!(paths.iter().any(|p| p.ends_with("pkg/__init__.py")));
        assert!(paths.iter().any(|p| p.ends_with("pkg/a.py")));
        assert!(paths.iter().any(|p| p.ends_with("pkg/sub/__init__.py")));
        assert!(paths.iter().any(|p| p.ends_with("pkg/sub/b.py")));
    }

    #[test]
    fn test_results_are_sorted_and_inside_root() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let paths = discover_paths(temp.path(), "**/*").unwrap();

        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert!(paths.iter().all(|p| p.starts_with(temp.path())));
    }

    #[test]
    fn test_flat_pattern() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let paths = discover_paths(temp.path().join("pkg"), "*.py").unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("pkg/__init__.py"));
        assert!(paths[1].ends_with("pkg/a.py"));
    }

    #[test]
    fn test_pattern_cannot_escape_root() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let paths = discover_paths(temp.path().join("pkg/sub"), "../*.py").unwrap();

        assert!(paths.is_empty());
    }

    #[test]
    fn test_current_dir_components_are_ignored() {
        assert_eq!(without_cur_dir(Path::new("./pkg/./sub")), PathBuf::from("pkg/sub"));
        assert_eq!(without_cur_dir(Path::new("/tmp/./pkg/")), PathBuf::from("/tmp/pkg"));
        assert_eq!(without_cur_dir(Path::new(".")), PathBuf::new());
    }

    #[test]
    fn test_root_with_trailing_separator() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());
        let root = format!("{}/", temp.path().join("pkg").display());

        let paths = discover_paths(&root, "*.py").unwrap();

        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_root_is_registered() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());
        let mut discovery = Discovery::new();

        discovery.discover_paths(temp.path(), "*.py").unwrap();

        let root = absolute(temp.path());
        assert!(discovery.search_roots().contains(&root));
    }

    #[test]
    fn test_empty_root_is_invalid() {
        let result = discover_paths("", "**/*.py");

        assert!(matches!(result, Err(DiscoverError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_glob_pattern() {
        let temp = tempdir().unwrap();
        let result = discover_paths(temp.path(), "[invalid");

        if let Err(DiscoverError::InvalidGlob { pattern, .. }) = result {
            assert_eq!(pattern, "[invalid");
        } else {
            panic!("Expected InvalidGlob error");
        }
    }

    #[test]
    fn test_search_roots_priority() {
        let mut roots = SearchRoots::new();

        assert!(roots.register("/a"));
        assert!(roots.register("/b"));
        assert!(!roots.register("/a"));

        let order: Vec<&Path> = roots.iter().collect();
        assert_eq!(order, vec![Path::new("/a"), Path::new("/b")]);
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn test_search_roots_from_list() {
        let roots: SearchRoots = vec![PathBuf::from("/x"), PathBuf::from("/y"), PathBuf::from("/x")]
            .into_iter()
            .collect();

        let order: Vec<&Path> = roots.iter().collect();
        assert_eq!(order, vec![Path::new("/x"), Path::new("/y")]);
    }
}
