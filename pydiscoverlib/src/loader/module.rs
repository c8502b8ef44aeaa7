//! Loaded modules and their members.
//!
//! A [`Module`] is a cheap-to-clone, immutable handle. Its classes,
//! functions and module-level bindings were indexed once when it was loaded.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::source::PACKAGE_MARKER;
use crate::Result;

use super::index::index_module;
use super::syntax::parse_module;
use super::value::Value;

/// Whether a name is private by convention.
pub(crate) fn is_private_name(name: &str) -> bool {
    name.starts_with('_')
}

/// How a function is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// Module-level function
    Function,
    /// Function defined in a class body
    Method,
    /// Method decorated with `@staticmethod`
    StaticMethod,
    /// Method decorated with `@classmethod`
    ClassMethod,
}

/// How a parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Positional,
    /// `*args`
    VarPositional,
    /// After `*` or `*args`
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Parameter {
    pub name: String,
    /// Annotation text, if any
    pub hint: Option<String>,
    /// Default value text, if any
    pub default: Option<String>,
    pub kind: ParameterKind,
}

/// A function or method.
#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub name: String,
    /// Dotted name of the defining module
    pub module: String,
    /// Qualified name of the owning class, for methods
    pub owner: Option<String>,
    pub parameters: Vec<Parameter>,
    /// Return annotation text, if any
    pub returns: Option<String>,
    pub kind: FunctionKind,
    pub is_async: bool,
    pub decorators: Vec<String>,
    /// 1-based line of the `def`
    pub line: usize,
}

impl Function {
    pub fn is_private(&self) -> bool {
        is_private_name(&self.name)
    }

    pub fn is_public(&self) -> bool {
        !self.is_private()
    }

    /// Name qualified by the owning class, e.g. `Parser.parse`.
    pub fn qualname(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.name),
            None => self.name.clone(),
        }
    }

    /// Fully qualified name, e.g. `pkg.module.Parser.parse`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.qualname())
    }

    /// Parameters that take part in a call signature.
    ///
    /// The implicit `self` of a method and `cls` of a class method are left
    /// out.
    pub fn call_parameters(&self) -> &[Parameter] {
        let bound = matches!(self.kind, FunctionKind::Method | FunctionKind::ClassMethod);
        match self.parameters.first() {
            Some(first) if bound && first.kind == ParameterKind::Positional => &self.parameters[1..],
            _ => &self.parameters,
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
            && self.owner == other.owner
            && self.name == other.name
            && self.line == other.line
    }
}

impl Eq for Function {}

impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.hash(state);
        self.owner.hash(state);
        self.name.hash(state);
        self.line.hash(state);
    }
}

/// A class and the members of its body.
#[derive(Debug, Clone, Serialize)]
pub struct Class {
    pub name: String,
    /// Dotted name of the defining module
    pub module: String,
    /// Name qualified by enclosing classes, e.g. `Outer.Inner`
    pub qualname: String,
    /// Base class expressions as written
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    /// 1-based line of the `class` statement
    pub line: usize,
    /// Classes nested in the body
    pub classes: Vec<Class>,
    /// Methods of the body
    pub functions: Vec<Function>,
}

impl Class {
    pub fn is_private(&self) -> bool {
        is_private_name(&self.name)
    }

    pub fn is_public(&self) -> bool {
        !self.is_private()
    }

    /// Fully qualified name, e.g. `pkg.module.Outer.Inner`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }

    /// Simple names of the base classes (`pkg.Base[T]` gives `Base`).
    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.bases.iter().map(|base| {
            let base = base.split('[').next().unwrap_or(base).trim();
            base.rsplit('.').next().unwrap_or(base)
        })
    }

    /// This class and every class nested in it, depth first.
    pub fn walk(&self) -> Vec<&Class> {
        let mut all = vec![self];
        for nested in &self.classes {
            all.extend(nested.walk());
        }
        all
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && self.qualname == other.qualname && self.line == other.line
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.hash(state);
        self.qualname.hash(state);
        self.line.hash(state);
    }
}

/// Everything found in a module body.
#[derive(Debug, Default)]
pub(crate) struct ModuleBody {
    pub classes: Vec<Class>,
    pub functions: Vec<Function>,
    pub namespace: BTreeMap<String, Value>,
    /// Local name of each module-level import and the dotted name it refers to
    pub imports: BTreeMap<String, String>,
}

struct ModuleData {
    name: String,
    path: PathBuf,
    source: String,
    body: ModuleBody,
}

/// A loaded module.
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleData>,
}

impl Module {
    /// Load a module from its source text.
    ///
    /// Fails with [`DiscoverError::Syntax`](crate::DiscoverError::Syntax) if
    /// the source is not valid Python.
    pub fn load(name: impl Into<String>, path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let path = path.into();
        let source = source.into();
        let is_package = path.file_name().is_some_and(|f| f == PACKAGE_MARKER);

        let suite = parse_module(&source, &path.to_string_lossy())?;
        let body = index_module(&name, is_package, &source, &suite);

        Ok(Self {
            inner: Arc::new(ModuleData {
                name,
                path,
                source,
                body,
            }),
        })
    }

    /// Load a module that has no file, for sources held in memory.
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        Self::load(name, PathBuf::new(), source)
    }

    /// Dotted name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Path of the source file (empty for in-memory modules).
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Full source text.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Top-level classes in definition order.
    pub fn classes(&self) -> &[Class] {
        &self.inner.body.classes
    }

    /// Top-level functions in definition order.
    pub fn functions(&self) -> &[Function] {
        &self.inner.body.functions
    }

    /// Look up a module-level binding.
    pub fn getattr(&self, name: &str) -> Option<&Value> {
        self.inner.body.namespace.get(name)
    }

    /// Dotted name a module-level import binds to `local`.
    ///
    /// `from .base import Plugin` in `pkg.mod` maps `Plugin` to
    /// `pkg.base.Plugin`; `import a.b as ab` maps `ab` to `a.b`.
    pub fn import_target(&self, local: &str) -> Option<&str> {
        self.inner.body.imports.get(local).map(String::as_str)
    }

    /// Names bound at module level, sorted.
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.inner.body.namespace.keys().map(String::as_str)
    }

    /// A module is private when its own name (the last dotted part) starts
    /// with an underscore.
    pub fn is_private(&self) -> bool {
        let stem = self.name().rsplit('.').next().unwrap_or_default();
        is_private_name(stem)
    }

    /// Find a top-level class by name.
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes().iter().find(|c| c.name == name)
    }

    /// Find a top-level function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions().iter().find(|f| f.name == name)
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.name == other.inner.name && self.inner.path == other.inner.path)
    }
}

impl Eq for Module {}

impl Hash for Module {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
        self.inner.path.hash(state);
    }
}

impl PartialOrd for Module {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Module {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.name(), self.path()).cmp(&(other.name(), other.path()))
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .finish()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
