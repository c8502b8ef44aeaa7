//! Package detection and dotted package names.
//!
//! A directory is a package when it directly contains [`PACKAGE_MARKER`].
//! The dotted name of a package is built by walking up through parent
//! directories for as long as they are packages too.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DiscoverError;
use crate::session::Discovery;
use crate::Result;

use super::paths::{absolute, checked_dir};

/// File that marks a directory as a package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Check if a directory directly contains the package marker.
pub fn is_package(dir: impl AsRef<Path>) -> bool {
    dir.as_ref().join(PACKAGE_MARKER).is_file()
}

/// Walk up from `dir` while directories are packages.
///
/// Returns the package names from the outermost package down to `dir`, and
/// the directory that holds the outermost package.
fn package_lineage(dir: &Path) -> (Vec<String>, Option<PathBuf>) {
    let mut parts = Vec::new();
    let mut current = Some(dir);
    let mut base = None;

    while let Some(candidate) = current {
        if !is_package(candidate) {
            break;
        }
        match candidate.file_name() {
            Some(name) => parts.push(name.to_string_lossy().into_owned()),
            None => break,
        }
        base = candidate.parent().map(Path::to_path_buf);
        current = candidate.parent();
    }

    parts.reverse();
    (parts, base)
}

/// Compute the dotted package name of a directory.
///
/// Returns an empty string if the directory is not a package.
pub fn to_package_name(dir: impl AsRef<Path>) -> String {
    let dir = absolute(dir.as_ref());
    package_lineage(&dir).0.join(".")
}

/// Whether `name` is `base` or one of its dotted descendants.
fn is_within(name: &str, base: &str) -> bool {
    name == base
        || name
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Check if a directory should be skipped during traversal.
fn should_skip_dir(name: &str) -> bool {
    name.starts_with('.') || name == "__pycache__"
}

/// All directories below (and including) `root` that are packages.
fn package_dirs(root: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(root).follow_links(true).into_iter();

    let mut dirs: Vec<PathBuf> = walker
        .filter_entry(|e| {
            // Always include the root directory
            if e.depth() == 0 {
                return true;
            }
            if e.file_type().is_dir() {
                let name = e.file_name().to_str().unwrap_or("");
                return !should_skip_dir(name);
            }
            false
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir() && is_package(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    dirs.sort();
    dirs
}

impl Discovery {
    /// Map every package directory below `root` to its dotted name.
    ///
    /// Only the root package and its dotted descendants are kept: a package
    /// below a plain directory gets a name of its own and is left out.
    pub(crate) fn packages_per_path(&mut self, root: &Path) -> Result<BTreeMap<PathBuf, String>> {
        let root = checked_dir(root)?;
        if !root.exists() {
            return Err(DiscoverError::invalid(format!(
                "directory '{}' does not exist",
                root.display()
            )));
        }
        if !is_package(root) {
            return Err(DiscoverError::invalid(format!(
                "directory '{}' is not a package",
                root.display()
            )));
        }

        let root = absolute(root);
        let (parts, base_dir) = package_lineage(&root);
        let base_package = parts.join(".");

        self.register_root(root.clone());
        if let Some(base_dir) = base_dir {
            self.register_root(base_dir);
        }

        let packages = package_dirs(&root)
            .into_iter()
            .map(|dir| {
                let name = package_lineage(&dir).0.join(".");
                (dir, name)
            })
            .filter(|(_, name)| is_within(name, &base_package))
            .collect();

        Ok(packages)
    }

    /// Return the sorted dotted names of the packages below `root`.
    ///
    /// `root` must exist and must itself be a package. The result always
    /// contains the root package.
    pub fn discover_packages(&mut self, root: impl AsRef<Path>) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .packages_per_path(root.as_ref())?
            .into_values()
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Return the sorted dotted names of the packages below `root`.
pub fn discover_packages(root: impl AsRef<Path>) -> Result<Vec<String>> {
    Discovery::new().discover_packages(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_tree(dir: &Path) {
        fs::create_dir_all(dir.join("outer/inner/deep")).unwrap();
        fs::create_dir_all(dir.join("outer/plain/island")).unwrap();
        fs::create_dir_all(dir.join("outer/__pycache__")).unwrap();

        fs::write(dir.join("outer/__init__.py"), "").unwrap();
        fs::write(dir.join("outer/inner/__init__.py"), "").unwrap();
        fs::write(dir.join("outer/inner/deep/__init__.py"), "").unwrap();
        fs::write(dir.join("outer/plain/module.py"), "").unwrap();
        fs::write(dir.join("outer/plain/island/__init__.py"), "").unwrap();
        fs::write(dir.join("outer/__pycache__/__init__.py"), "").unwrap();
    }

    #[test]
    fn test_is_package() {
        let temp = tempdir().unwrap();
        create_test_tree(temp.path());

        assert!(is_package(temp.path().join("outer")));
        assert!(is_package(temp.path().join("outer/inner")));
        assert!(!is_package(temp.path().join("outer/plain")));
        assert!(!is_package(temp.path()));
    }

    #[test]
    fn test_to_package_name() {
        let temp = tempdir().unwrap();
        create_test_tree(temp.path());

        assert_eq!(to_package_name(temp.path().join("outer")), "outer");
        assert_eq!(
            to_package_name(temp.path().join("outer/inner/deep")),
            "outer.inner.deep"
        );
        assert_eq!(to_package_name(temp.path().join("outer/plain/island")), "island");
        assert_eq!(to_package_name(temp.path().join("outer/plain")), "");
    }

    #[test]
    fn test_discover_packages() {
        let temp = tempdir().unwrap();
        create_test_tree(temp.path());

        let packages = discover_packages(temp.path().join("outer")).unwrap();

        assert_eq!(packages, vec!["outer", "outer.inner", "outer.inner.deep"]);
    }

    #[test]
    fn test_discover_nested_root_keeps_full_name() {
        let temp = tempdir().unwrap();
        create_test_tree(temp.path());

        let packages = discover_packages(temp.path().join("outer/inner")).unwrap();

        assert_eq!(packages, vec!["outer.inner", "outer.inner.deep"]);
    }

    #[test]
    fn test_discover_packages_not_a_package() {
        let temp = tempdir().unwrap();
        create_test_tree(temp.path());

        let result = discover_packages(temp.path().join("outer/plain"));

        match result {
            Err(DiscoverError::InvalidArgument(message)) => {
                assert!(message.contains("not a package"))
            }
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_packages_missing_dir() {
        let temp = tempdir().unwrap();

        let result = discover_packages(temp.path().join("does_not_exist"));

        match result {
            Err(DiscoverError::InvalidArgument(message)) => {
                assert!(message.contains("does not exist"))
            }
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_registers_import_base() {
        let temp = tempdir().unwrap();
        create_test_tree(temp.path());
        let mut discovery = Discovery::new();

        discovery
            .discover_packages(temp.path().join("outer/inner"))
            .unwrap();

        let base = absolute(temp.path());
        assert!(discovery.search_roots().contains(&base));
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("pkg", "pkg"));
        assert!(is_within("pkg.sub", "pkg"));
        assert!(!is_within("pkg2", "pkg"));
        assert!(!is_within("other.pkg", "pkg"));
    }
}
