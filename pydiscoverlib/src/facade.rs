//! One-call discovery.
//!
//! [`discover`] picks the kind of member from a [`Shape`] and defaults the
//! source to the directory of the calling source file ([`here`]).

use std::env;
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::DiscoverError;
use crate::loader::{Class, Function, Module};
use crate::query::{Attribute, AttributeQuery, ClassQuery, DiscoverOptions, FunctionQuery};
use crate::session::Discovery;
use crate::source::Source;
use crate::Result;

/// Directory of the source file that calls this function.
///
/// The file name recorded by the compiler is relative to the directory the
/// build ran in. It is resolved against the current directory and then its
/// ancestors, so calls from a workspace member work when tests run in the
/// member's directory.
///
/// To report the caller of a helper instead, mark the helper
/// `#[track_caller]` too.
#[track_caller]
pub fn here() -> PathBuf {
    let file = Path::new(Location::caller().file());
    resolve_source_file(file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn resolve_source_file(file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    let Ok(cwd) = env::current_dir() else {
        return file.to_path_buf();
    };
    cwd.ancestors()
        .map(|dir| dir.join(file))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| cwd.join(file))
}

/// What [`discover`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Shape {
    /// `list`, `List`, `List[type]`
    #[default]
    Classes,
    /// `List[Callable]`
    Functions,
    /// `List[Attribute]`
    Attributes,
    /// `List[Module]`
    Modules,
}

impl FromStr for Shape {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self> {
        let text: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match text.as_str() {
            "list" | "List" | "List[type]" | "list[type]" | "List[Type]" | "typing.List" => {
                Ok(Shape::Classes)
            }
            "List[Callable]" | "list[Callable]" => Ok(Shape::Functions),
            "List[Attribute]" | "list[Attribute]" => Ok(Shape::Attributes),
            "List[Module]" | "list[Module]" => Ok(Shape::Modules),
            _ => Err(DiscoverError::invalid(format!(
                "unsupported type to discover: {}",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Classes => "List[type]",
            Shape::Functions => "List[Callable]",
            Shape::Attributes => "List[Attribute]",
            Shape::Modules => "List[Module]",
        })
    }
}

/// Members found by [`discover`].
#[derive(Debug, Clone)]
pub enum Discovered {
    Classes(Vec<Class>),
    Functions(Vec<Function>),
    Attributes(Vec<Attribute>),
    Modules(Vec<Module>),
}

impl Discovered {
    pub fn len(&self) -> usize {
        match self {
            Discovered::Classes(items) => items.len(),
            Discovered::Functions(items) => items.len(),
            Discovered::Attributes(items) => items.len(),
            Discovered::Modules(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the members, in result order.
    pub fn names(&self) -> Vec<String> {
        match self {
            Discovered::Classes(items) => items.iter().map(|c| c.name.clone()).collect(),
            Discovered::Functions(items) => items.iter().map(|f| f.name.clone()).collect(),
            Discovered::Attributes(items) => items.iter().map(|a| a.name.clone()).collect(),
            Discovered::Modules(items) => items.iter().map(|m| m.name().to_string()).collect(),
        }
    }

    pub fn into_classes(self) -> Option<Vec<Class>> {
        match self {
            Discovered::Classes(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_functions(self) -> Option<Vec<Function>> {
        match self {
            Discovered::Functions(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_attributes(self) -> Option<Vec<Attribute>> {
        match self {
            Discovered::Attributes(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_modules(self) -> Option<Vec<Module>> {
        match self {
            Discovered::Modules(items) => Some(items),
            _ => None,
        }
    }
}

impl Discovery {
    /// Discover members of the given shape in `source`.
    ///
    /// Without a source, the directory of the calling file is used.
    #[track_caller]
    pub fn discover(
        &mut self,
        source: Option<Source>,
        what: Shape,
        options: DiscoverOptions,
    ) -> Result<Discovered> {
        // Not a closure: the caller location has to reach `here`
        let source = match source {
            Some(source) => source,
            None => Source::Path(here()),
        };

        match what {
            Shape::Classes => self
                .discover_classes(source, &ClassQuery::new().options(options))
                .map(Discovered::Classes),
            Shape::Functions => self
                .discover_functions(source, &FunctionQuery::new().options(options))
                .map(Discovered::Functions),
            Shape::Attributes => self
                .discover_attributes(source, &AttributeQuery::new().options(options))
                .map(Discovered::Attributes),
            Shape::Modules => {
                let modules = self.resolve_source_modules(
                    &source,
                    options.in_private_modules,
                    options.raise_on_fail,
                )?;
                Ok(Discovered::Modules(
                    modules
                        .into_iter()
                        .filter(|m| options.admits_module(m.is_private()))
                        .collect(),
                ))
            }
        }
    }
}

/// Discover members of the given shape in `source`.
///
/// Without a source, the directory of the calling file is used.
///
/// ```rust,ignore
/// use pydiscoverlib::{discover, DiscoverOptions, Shape};
///
/// let classes = discover(None, "List[type]".parse()?, DiscoverOptions::new())?;
/// ```
#[track_caller]
pub fn discover(source: Option<Source>, what: Shape, options: DiscoverOptions) -> Result<Discovered> {
    Discovery::new().discover(source, what, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_here() {
        let dir = here();

        assert!(dir.join("facade.rs").is_file());
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!("list".parse::<Shape>().unwrap(), Shape::Classes);
        assert_eq!("List".parse::<Shape>().unwrap(), Shape::Classes);
        assert_eq!("List[type]".parse::<Shape>().unwrap(), Shape::Classes);
        assert_eq!("List[ Callable ]".parse::<Shape>().unwrap(), Shape::Functions);
        assert_eq!("List[Attribute]".parse::<Shape>().unwrap(), Shape::Attributes);
        assert_eq!("List[Module]".parse::<Shape>().unwrap(), Shape::Modules);
    }

    #[test]
    fn test_unsupported_shape_names_it() {
        match "int".parse::<Shape>() {
            Err(DiscoverError::InvalidArgument(message)) => assert!(message.contains("int")),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_each_shape() {
        let temp = tempdir().unwrap();
        let pkg = temp.path().join("shop");
        fs::create_dir(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), "").unwrap();
        fs::write(
            pkg.join("cart.py"),
            "TAX = 0.21\n\nclass Cart:\n    pass\n\ndef total(cart):\n    pass\n",
        )
        .unwrap();
        let mut discovery = Discovery::new();
        let options = DiscoverOptions::new();

        let classes = discovery
            .discover(Some(Source::from(&pkg)), Shape::Classes, options)
            .unwrap();
        let functions = discovery
            .discover(Some(Source::from(&pkg)), Shape::Functions, options)
            .unwrap();
        let attributes = discovery
            .discover(Some(Source::from(&pkg)), Shape::Attributes, options)
            .unwrap();
        let modules = discovery
            .discover(Some(Source::from(&pkg)), Shape::Modules, options)
            .unwrap();

        assert_eq!(classes.names(), vec!["Cart"]);
        assert_eq!(functions.names(), vec!["total"]);
        assert_eq!(attributes.names(), vec!["TAX"]);
        assert_eq!(modules.names(), vec!["shop.cart"]);
        assert!(modules.into_classes().is_none());
    }
}
