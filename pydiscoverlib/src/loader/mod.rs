//! Module loading.
//!
//! This module handles the second stage of the pipeline, turning dotted
//! module names into loaded [`Module`] handles. It provides:
//!
//! - **Parsing**: Python syntax via `rustpython-parser`, plus statement
//!   placement checks ([`syntax`])
//! - **Indexing**: classes, functions, imports and module-level bindings ([`index`])
//! - **Values**: literal classification of right-hand sides ([`value`])
//! - **Registry**: name discovery, loading from search roots, caching
//!
//! Modules are loaded from the search roots of a [`Discovery`] session. A
//! module that was loaded once is served from the session's registry.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pydiscoverlib::Discovery;
//!
//! let mut discovery = Discovery::new();
//! let names = discovery.discover_module_names("src/plugins", false)?;
//! let modules = discovery.discover_modules("src/plugins", false, false)?;
//! ```

pub(crate) mod index;
pub mod module;
pub(crate) mod syntax;
pub mod value;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::DiscoverError;
use crate::session::Discovery;
use crate::source::paths::matching_paths;
use crate::source::{Source, PACKAGE_MARKER};
use crate::Result;

pub use module::{Class, Function, FunctionKind, Module, Parameter, ParameterKind};
pub use value::{Value, ValueType};

/// Candidate files for a dotted name below one search root.
fn candidate_files(root: &Path, name: &str) -> [PathBuf; 2] {
    let mut base = root.to_path_buf();
    for part in name.split('.') {
        base.push(part);
    }
    [base.with_extension("py"), base.join(PACKAGE_MARKER)]
}

impl Discovery {
    /// Return the sorted dotted names of the modules below `root`.
    ///
    /// Every `*.py` file directly inside each package is a module, except
    /// the package marker itself. Modules whose name starts with an
    /// underscore are left out unless `include_privates` is set.
    pub fn discover_module_names(
        &mut self,
        root: impl AsRef<Path>,
        include_privates: bool,
    ) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for (dir, package) in self.packages_per_path(root.as_ref())? {
            for path in matching_paths(&dir, "*.py")? {
                let stem = match path.file_stem() {
                    Some(stem) => stem.to_string_lossy(),
                    None => continue,
                };
                if path.file_name().is_some_and(|n| n == PACKAGE_MARKER) {
                    continue;
                }
                if !include_privates && stem.starts_with('_') {
                    continue;
                }
                names.push(format!("{}.{}", package, stem));
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load every module below `root`, sorted by dotted name.
    ///
    /// A module that fails to load is skipped, or returned as an
    /// [`DiscoverError::ImportFailure`] when `raise_on_fail` is set.
    pub fn discover_modules(
        &mut self,
        root: impl AsRef<Path>,
        include_privates: bool,
        raise_on_fail: bool,
    ) -> Result<Vec<Module>> {
        let names = self.discover_module_names(root, include_privates)?;
        let mut modules = Vec::with_capacity(names.len());

        for name in names {
            match self.import_module(&name) {
                Ok(module) => modules.push(module),
                Err(err) if raise_on_fail => return Err(err),
                Err(err) => {
                    debug!(module = %name, error = %err, "skipping module that failed to load");
                }
            }
        }

        Ok(modules)
    }

    /// Load a module by dotted name.
    ///
    /// The registry is consulted first. Otherwise each search root is tried
    /// in priority order, for `a/b/c.py` and then `a/b/c/__init__.py`.
    pub fn import_module(&mut self, name: &str) -> Result<Module> {
        if let Some(module) = self.registry.get(name) {
            return Ok(module.clone());
        }
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return Err(DiscoverError::import_failure(
                name,
                DiscoverError::invalid(format!("'{}' is not a dotted module name", name)),
            ));
        }

        let path = self
            .roots
            .iter()
            .flat_map(|root| candidate_files(root, name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                DiscoverError::import_failure(name, DiscoverError::ModuleNotFound(name.to_string()))
            })?;

        let source = fs::read_to_string(&path).map_err(|e| {
            DiscoverError::import_failure(name, DiscoverError::FileRead { path: path.clone(), source: e })
        })?;
        let module =
            Module::load(name, path, source).map_err(|e| DiscoverError::import_failure(name, e))?;

        debug!(module = %name, path = %module.path().display(), "loaded module");
        self.registry.insert(name.to_string(), module.clone());
        Ok(module)
    }

    /// Turn a source into the modules it stands for.
    ///
    /// Paths are discovered as package trees, including private modules when
    /// `in_private_modules` is set. A class does not stand for any module.
    pub fn resolve_source_modules(
        &mut self,
        source: &Source,
        in_private_modules: bool,
        raise_on_fail: bool,
    ) -> Result<Vec<Module>> {
        match source {
            Source::Path(path) => self.discover_modules(path, in_private_modules, raise_on_fail),
            Source::Module(module) => Ok(vec![module.clone()]),
            Source::Modules(modules) => Ok(modules.clone()),
            Source::Class(_) => Err(DiscoverError::invalid(format!(
                "the source must be a path, a module or a list of modules, given: {}",
                source.describe()
            ))),
        }
    }
}

/// Return the sorted dotted names of the modules below `root`.
pub fn discover_module_names(root: impl AsRef<Path>, include_privates: bool) -> Result<Vec<String>> {
    Discovery::new().discover_module_names(root, include_privates)
}

/// Load every module below `root`, sorted by dotted name.
pub fn discover_modules(
    root: impl AsRef<Path>,
    include_privates: bool,
    raise_on_fail: bool,
) -> Result<Vec<Module>> {
    Discovery::new().discover_modules(root, include_privates, raise_on_fail)
}
