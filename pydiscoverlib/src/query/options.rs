//! Query options.
//!
//! Every discovery of members takes the same three switches
//! ([`DiscoverOptions`]); each member kind adds its own filter on top.

use super::members::Exclude;
use super::signature::{ClassSignature, FunctionSignature, ValueSignature};

/// Switches shared by all member discoveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverOptions {
    /// Keep members whose name starts with an underscore
    pub include_privates: bool,
    /// Look into modules whose name starts with an underscore
    pub in_private_modules: bool,
    /// Fail on the first module that cannot be loaded
    pub raise_on_fail: bool,
}

impl DiscoverOptions {
    /// Create new default options: public members of public modules,
    /// modules that fail to load are skipped.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_privates(mut self, yes: bool) -> Self {
        self.include_privates = yes;
        self
    }

    pub fn in_private_modules(mut self, yes: bool) -> Self {
        self.in_private_modules = yes;
        self
    }

    pub fn raise_on_fail(mut self, yes: bool) -> Self {
        self.raise_on_fail = yes;
        self
    }

    /// Whether a member with this visibility passes.
    pub(crate) fn admits_member(&self, is_private: bool) -> bool {
        self.include_privates || !is_private
    }

    /// Whether members of a module with this visibility pass.
    pub(crate) fn admits_module(&self, is_private: bool) -> bool {
        self.in_private_modules || !is_private
    }
}

macro_rules! option_setters {
    () => {
        /// Replace all shared switches at once.
        pub fn options(mut self, options: DiscoverOptions) -> Self {
            self.options = options;
            self
        }

        pub fn include_privates(mut self, yes: bool) -> Self {
            self.options.include_privates = yes;
            self
        }

        pub fn in_private_modules(mut self, yes: bool) -> Self {
            self.options.in_private_modules = yes;
            self
        }

        pub fn raise_on_fail(mut self, yes: bool) -> Self {
            self.options.raise_on_fail = yes;
            self
        }
    };
}

/// Options for [`discover_classes`](crate::discover_classes).
#[derive(Debug, Clone, Default)]
pub struct ClassQuery {
    pub options: DiscoverOptions,
    /// Required base class
    pub signature: ClassSignature,
    /// Classes to leave out
    pub exclude: Exclude,
}

impl ClassQuery {
    pub fn new() -> Self {
        Self::default()
    }

    option_setters!();

    /// Keep only subclasses of the given base.
    pub fn signature(mut self, signature: ClassSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Leave out classes, by identity or by predicate.
    ///
    /// Exclusions accumulate over repeated calls.
    pub fn exclude(mut self, exclude: impl Into<Exclude>) -> Self {
        self.exclude.extend(exclude.into());
        self
    }
}

/// Options for [`discover_functions`](crate::discover_functions).
#[derive(Debug, Clone, Default)]
pub struct FunctionQuery {
    pub options: DiscoverOptions,
    /// Required call signature
    pub signature: FunctionSignature,
}

impl FunctionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    option_setters!();

    /// Keep only functions compatible with the given signature.
    pub fn signature(mut self, signature: FunctionSignature) -> Self {
        self.signature = signature;
        self
    }
}

/// Options for [`discover_attributes`](crate::discover_attributes).
#[derive(Debug, Clone, Default)]
pub struct AttributeQuery {
    pub options: DiscoverOptions,
    /// Required value type
    pub signature: ValueSignature,
}

impl AttributeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    option_setters!();

    /// Keep only attributes whose value is an instance of the signature.
    pub fn signature(mut self, signature: ValueSignature) -> Self {
        self.signature = signature;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ValueType;

    #[test]
    fn test_default_options() {
        let options = DiscoverOptions::new();

        assert!(options.admits_member(false));
        assert!(!options.admits_member(true));
        assert!(!options.admits_module(true));
        assert!(!options.raise_on_fail);
    }

    #[test]
    fn test_query_builders() {
        let query = AttributeQuery::new()
            .include_privates(true)
            .raise_on_fail(true)
            .signature(ValueSignature::of(ValueType::Int));

        assert!(query.options.include_privates);
        assert!(!query.options.in_private_modules);
        assert!(query.options.raise_on_fail);
        assert_eq!(query.signature, ValueSignature::of(ValueType::Int));
    }

    #[test]
    fn test_exclusions_accumulate() {
        let query = ClassQuery::new()
            .exclude(Exclude::predicate(|c| c.name == "A"))
            .exclude(Exclude::predicate(|c| c.name == "B"));

        assert_eq!(query.exclude.len(), 2);
    }
}
