//! Class and function discovery.
//!
//! Members are taken from the modules a [`Source`] stands for, or from the
//! body of a class when the source is a class. Filters run in this order:
//! signature, identity exclusions, module visibility, member visibility,
//! predicate exclusions. Results are deduplicated and sorted by name.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::loader::{Class, Function, Module};
use crate::session::Discovery;
use crate::source::Source;
use crate::Result;

use super::options::{ClassQuery, DiscoverOptions, FunctionQuery};
use super::signature::ClassSignature;

type Predicate = Arc<dyn Fn(&Class) -> bool + Send + Sync>;

/// One rule for leaving a class out.
#[derive(Clone)]
pub enum Exclusion {
    /// Leave out this very class
    Class(Class),
    /// Leave out every class the predicate returns `true` for
    Predicate(Predicate),
}

impl Exclusion {
    pub fn predicate(predicate: impl Fn(&Class) -> bool + Send + Sync + 'static) -> Self {
        Exclusion::Predicate(Arc::new(predicate))
    }
}

impl fmt::Debug for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Class(class) => f.debug_tuple("Class").field(&class.qualified_name()).finish(),
            Exclusion::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A set of exclusions: classes excluded by identity and predicates.
#[derive(Debug, Clone, Default)]
pub struct Exclude {
    rules: Vec<Exclusion>,
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a single predicate.
    pub fn predicate(predicate: impl Fn(&Class) -> bool + Send + Sync + 'static) -> Self {
        Exclusion::predicate(predicate).into()
    }

    pub fn extend(&mut self, other: Exclude) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn excludes_identity(&self, class: &Class) -> bool {
        self.rules
            .iter()
            .any(|rule| matches!(rule, Exclusion::Class(excluded) if excluded == class))
    }

    fn excludes_by_predicate(&self, class: &Class) -> bool {
        self.rules
            .iter()
            .any(|rule| matches!(rule, Exclusion::Predicate(predicate) if predicate(class)))
    }
}

impl From<Exclusion> for Exclude {
    fn from(rule: Exclusion) -> Self {
        Self { rules: vec![rule] }
    }
}

impl From<Class> for Exclude {
    fn from(class: Class) -> Self {
        Exclusion::Class(class).into()
    }
}

impl From<&Class> for Exclude {
    fn from(class: &Class) -> Self {
        Exclusion::Class(class.clone()).into()
    }
}

impl FromIterator<Exclusion> for Exclude {
    fn from_iter<I: IntoIterator<Item = Exclusion>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Hops through re-exports before an imported base is given up on.
const MAX_REEXPORTS: usize = 8;

/// The classes of a discovered set, to follow base classes through it.
///
/// A base is looked up the way its defining module sees it: a class of the
/// enclosing class body or of the module itself first, then the module's
/// imports (following re-exports through package modules of the set). A
/// bare name that is neither local nor imported only resolves when exactly
/// one class of the set carries it.
struct Hierarchy<'a> {
    by_qualified: HashMap<String, &'a Class>,
    by_name: HashMap<&'a str, Vec<&'a Class>>,
    modules: HashMap<&'a str, &'a Module>,
}

impl<'a> Hierarchy<'a> {
    fn new(classes: impl IntoIterator<Item = &'a Class>, modules: &'a [Module]) -> Self {
        let mut by_qualified = HashMap::new();
        let mut by_name: HashMap<&str, Vec<&Class>> = HashMap::new();
        for class in classes {
            by_qualified.insert(class.qualified_name(), class);
            by_name.entry(class.name.as_str()).or_default().push(class);
        }
        let modules = modules.iter().map(|m| (m.name(), m)).collect();
        Self {
            by_qualified,
            by_name,
            modules,
        }
    }

    /// Class with this dotted name, seen through re-exporting modules.
    fn lookup(&self, dotted: &str) -> Option<&'a Class> {
        let mut dotted = dotted.to_string();
        for _ in 0..=MAX_REEXPORTS {
            if let Some(&class) = self.by_qualified.get(&dotted) {
                return Some(class);
            }
            let (module, name) = dotted.rsplit_once('.')?;
            let target = self.modules.get(module)?.import_target(name)?;
            dotted = target.to_string();
        }
        None
    }

    /// The class a base expression of `class` refers to, if it is in the set.
    fn resolve(&self, class: &Class, base: &str) -> Option<&'a Class> {
        let base = base.split('[').next().unwrap_or(base).trim();
        let (head, rest) = match base.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (base, None),
        };
        let with_rest = |prefix: String| match rest {
            Some(rest) => format!("{}.{}", prefix, rest),
            None => prefix,
        };

        let mut scopes = Vec::with_capacity(2);
        if let Some((owner, _)) = class.qualname.rsplit_once('.') {
            scopes.push(format!("{}.{}.{}", class.module, owner, head));
        }
        scopes.push(format!("{}.{}", class.module, head));
        for scope in scopes {
            if let Some(&found) = self.by_qualified.get(&with_rest(scope)) {
                if found != class {
                    return Some(found);
                }
            }
        }

        let module = self.modules.get(class.module.as_str());
        if let Some(target) = module.and_then(|m| m.import_target(head)) {
            return self.lookup(&with_rest(target.to_string()));
        }
        if rest.is_some() {
            return self.lookup(base);
        }
        match self.by_name.get(base).map(Vec::as_slice) {
            Some(&[only]) if only != class => Some(only),
            _ => None,
        }
    }

    /// Whether `class` is `base` or derives from it.
    ///
    /// A base written with the requested name matches even when it lives
    /// outside the set (a builtin, a third-party import).
    fn is_subclass<'b>(&'b self, class: &'b Class, base: &str) -> bool {
        if base == "object" || class.name == base {
            return true;
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut pending: Vec<&Class> = vec![class];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.qualified_name()) {
                continue;
            }
            for (written, name) in current.bases.iter().zip(current.base_names()) {
                if name == base {
                    return true;
                }
                if let Some(parent) = self.resolve(current, written) {
                    if parent.name == base {
                        return true;
                    }
                    pending.push(parent);
                }
            }
        }
        false
    }
}

fn is_private_module_name(name: &str) -> bool {
    let stem = name.rsplit('.').next().unwrap_or(name);
    stem.starts_with('_')
}

impl Discovery {
    /// Modules for a source. A class source stands for no module.
    fn member_modules(&mut self, source: &Source, options: &DiscoverOptions) -> Result<Vec<Module>> {
        match source {
            Source::Class(_) => Ok(Vec::new()),
            source => {
                self.resolve_source_modules(source, options.in_private_modules, options.raise_on_fail)
            }
        }
    }

    /// Return the sorted, unique classes found in `source`.
    ///
    /// For a class source, the members are the classes nested in its body.
    pub fn discover_classes(
        &mut self,
        source: impl Into<Source>,
        query: &ClassQuery,
    ) -> Result<Vec<Class>> {
        let source = source.into();
        let options = &query.options;

        let modules = self.member_modules(&source, options)?;
        // An explicitly given class is searched whatever module it lives in
        let from_class = matches!(source, Source::Class(_));
        let (candidates, known): (Vec<&Class>, Vec<&Class>) = match &source {
            Source::Class(class) => (class.classes.iter().collect(), class.walk()),
            _ => (
                modules.iter().flat_map(|m| m.classes()).collect(),
                modules
                    .iter()
                    .flat_map(|m| m.classes())
                    .flat_map(Class::walk)
                    .collect(),
            ),
        };

        let hierarchy = Hierarchy::new(known, &modules);
        let mut classes: Vec<Class> = candidates
            .into_iter()
            .filter(|class| match &query.signature {
                ClassSignature::Any => true,
                ClassSignature::Subclass(base) => hierarchy.is_subclass(class, base),
            })
            .filter(|class| !query.exclude.excludes_identity(class))
            .filter(|class| from_class || options.admits_module(is_private_module_name(&class.module)))
            .filter(|class| options.admits_member(class.is_private()))
            .filter(|class| !query.exclude.excludes_by_predicate(class))
            .cloned()
            .collect();

        classes.sort_by(|a, b| {
            (&a.name, &a.module, &a.qualname, a.line).cmp(&(&b.name, &b.module, &b.qualname, b.line))
        });
        classes.dedup();
        Ok(classes)
    }

    /// Return the sorted, unique functions found in `source`.
    ///
    /// For module sources only module-level functions are members. For a
    /// class source every method of its body is, static and class methods
    /// included.
    pub fn discover_functions(
        &mut self,
        source: impl Into<Source>,
        query: &FunctionQuery,
    ) -> Result<Vec<Function>> {
        let source = source.into();
        let options = &query.options;

        let modules = self.member_modules(&source, options)?;
        let from_class = matches!(source, Source::Class(_));
        let candidates: Vec<&Function> = match &source {
            Source::Class(class) => class.functions.iter().collect(),
            _ => modules.iter().flat_map(|m| m.functions()).collect(),
        };

        let mut functions: Vec<Function> = candidates
            .into_iter()
            .filter(|function| query.signature.matches(function))
            .filter(|function| {
                from_class || options.admits_module(is_private_module_name(&function.module))
            })
            .filter(|function| options.admits_member(function.is_private()))
            .cloned()
            .collect();

        functions.sort_by(|a, b| {
            (&a.name, &a.module, &a.owner, a.line).cmp(&(&b.name, &b.module, &b.owner, b.line))
        });
        functions.dedup();
        Ok(functions)
    }
}

/// Return the sorted, unique classes found in `source`.
pub fn discover_classes(source: impl Into<Source>, query: &ClassQuery) -> Result<Vec<Class>> {
    Discovery::new().discover_classes(source, query)
}

/// Return the sorted, unique functions found in `source`.
pub fn discover_functions(source: impl Into<Source>, query: &FunctionQuery) -> Result<Vec<Function>> {
    Discovery::new().discover_functions(source, query)
}
