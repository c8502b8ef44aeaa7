//! # pydiscoverlib
//!
//! Discover packages, modules, classes, functions and attributes in Python
//! source trees without hand-maintained import lists.
//!
//! ## Overview
//!
//! Point the library at a directory that is a Python package (it contains an
//! `__init__.py`) and it will:
//!
//! - **Match paths**: glob for files below the directory
//! - **Resolve packages**: find nested packages and their dotted names
//! - **Load modules**: read and index every module into an immutable member table
//! - **Filter members**: classes and functions by visibility, location,
//!   signature and exclusion rules
//! - **Scan attributes**: find `name: hint = value  # comment` declarations,
//!   with the block string above them as documentation
//!
//! Loading never executes Python. A module's classes, functions and
//! module-level bindings are read from its source; literal values are
//! classified (`int`, `str`, `list`, ...) but expressions are not evaluated.
//!
//! ## Pipeline
//!
//! 1. [`source`]: what to discover from, path matching and package resolution
//! 2. [`loader`]: parsing, indexing and the module registry
//! 3. [`query`]: member filters and the attribute scanner
//!
//! A [`Discovery`] session carries the search roots and the loaded modules
//! through all three stages. The free functions below run on a fresh session.
//!
//! ## Example
//!
//! ```rust
//! use pydiscoverlib::{discover_attributes, discover_classes, AttributeQuery, ClassQuery};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let pkg = dir.path().join("plugins");
//! fs::create_dir(&pkg).unwrap();
//! fs::write(pkg.join("__init__.py"), "").unwrap();
//! fs::write(
//!     pkg.join("audio.py"),
//!     "RATE: int = 44100  # samples per second\n\nclass Mp3Plugin(Plugin):\n    pass\n",
//! )
//! .unwrap();
//!
//! let classes = discover_classes(&pkg, &ClassQuery::new()).unwrap();
//! assert_eq!(classes[0].name, "Mp3Plugin");
//!
//! let attributes = discover_attributes(&pkg, &AttributeQuery::new()).unwrap();
//! assert_eq!(attributes[0].name, "RATE");
//! assert_eq!(attributes[0].comment.as_deref(), Some("samples per second"));
//! ```

pub mod error;
pub mod facade;
pub mod loader;
pub mod query;
pub mod session;
pub mod source;

pub use error::DiscoverError;
pub use facade::{discover, here, Discovered, Shape};
pub use loader::{
    discover_module_names, discover_modules, Class, Function, FunctionKind, Module, Parameter,
    ParameterKind, Value, ValueType,
};
pub use query::{
    discover_attributes, discover_classes, discover_functions, match_attribute, Attribute,
    AttributeMatch, AttributeQuery, ClassQuery, ClassSignature, DiscoverOptions, Exclude,
    Exclusion, FunctionQuery, FunctionSignature, ValueSignature,
};
pub use session::Discovery;
pub use source::{
    discover_packages, discover_paths, is_package, to_package_name, SearchRoots, Source,
    PACKAGE_MARKER,
};

/// Result type for pydiscoverlib operations
pub type Result<T> = std::result::Result<T, DiscoverError>;
