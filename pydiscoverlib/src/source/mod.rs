//! Sources: what to discover from.
//!
//! This module handles the first stage of the pipeline, deciding which files
//! and packages take part in a discovery. It provides:
//!
//! - **Sources**: the accepted input shapes ([`Source`])
//! - **Path matching**: glob for files below a root, search root bookkeeping
//! - **Package resolution**: package detection and dotted package names
//!
//! ## Example
//!
//! ```rust,ignore
//! use pydiscoverlib::source::{discover_packages, discover_paths};
//!
//! let files = discover_paths("src/plugins", "**/*.py")?;
//! let packages = discover_packages("src/plugins")?;
//! ```

pub mod packages;
pub mod paths;

use std::path::{Path, PathBuf};

use crate::loader::{Class, Module};

pub use packages::{discover_packages, is_package, to_package_name, PACKAGE_MARKER};
pub use paths::{discover_paths, SearchRoots};

/// Anything members can be discovered in.
///
/// Paths are discovered as package trees, modules and module lists are used
/// as given, and a class stands for its own members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A directory that is a package
    Path(PathBuf),
    /// A single loaded module
    Module(Module),
    /// Several loaded modules
    Modules(Vec<Module>),
    /// A class, whose nested classes and methods are its members
    Class(Class),
}

impl Source {
    /// Short description of the shape, for error messages.
    pub fn describe(&self) -> String {
        match self {
            Source::Path(path) => format!("path '{}'", path.display()),
            Source::Module(module) => format!("module '{}'", module.name()),
            Source::Modules(modules) => format!("{} modules", modules.len()),
            Source::Class(class) => format!("class '{}'", class.qualified_name()),
        }
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<String> for Source {
    fn from(path: String) -> Self {
        Source::Path(PathBuf::from(path))
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<&PathBuf> for Source {
    fn from(path: &PathBuf) -> Self {
        Source::Path(path.clone())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<Module> for Source {
    fn from(module: Module) -> Self {
        Source::Module(module)
    }
}

impl From<&Module> for Source {
    fn from(module: &Module) -> Self {
        Source::Module(module.clone())
    }
}

impl From<Vec<Module>> for Source {
    fn from(modules: Vec<Module>) -> Self {
        Source::Modules(modules)
    }
}

impl From<&[Module]> for Source {
    fn from(modules: &[Module]) -> Self {
        Source::Modules(modules.to_vec())
    }
}

impl FromIterator<Module> for Source {
    fn from_iter<I: IntoIterator<Item = Module>>(iter: I) -> Self {
        Source::Modules(iter.into_iter().collect())
    }
}

impl From<Class> for Source {
    fn from(class: Class) -> Self {
        Source::Class(class)
    }
}

impl From<&Class> for Source {
    fn from(class: &Class) -> Self {
        Source::Class(class.clone())
    }
}

impl From<&Source> for Source {
    fn from(source: &Source) -> Self {
        source.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_like_sources() {
        let expected = Source::Path(PathBuf::from("pkg/sub"));

        assert_eq!(Source::from("pkg/sub"), expected);
        assert_eq!(Source::from(String::from("pkg/sub")), expected);
        assert_eq!(Source::from(Path::new("pkg/sub")), expected);
        assert_eq!(Source::from(PathBuf::from("pkg/sub")), expected);
    }

    #[test]
    fn test_module_sources() {
        let module = Module::from_source("pkg.mod", "X = 1\n").unwrap();

        assert_eq!(Source::from(&module), Source::Module(module.clone()));
        assert_eq!(
            vec![module.clone()].into_iter().collect::<Source>(),
            Source::Modules(vec![module])
        );
    }

    #[test]
    fn test_describe() {
        let module = Module::from_source("pkg.mod", "").unwrap();

        assert_eq!(Source::from("a/b").describe(), "path 'a/b'");
        assert_eq!(Source::from(module).describe(), "module 'pkg.mod'");
        assert_eq!(Source::Modules(vec![]).describe(), "0 modules");
    }
}
