//! Member queries over loaded modules.
//!
//! This module handles the last stage of the pipeline, picking members out
//! of the modules a [`Source`](crate::Source) stands for:
//!
//! - **Classes**: by base class, visibility and exclusion rules
//! - **Functions**: by call signature and visibility
//! - **Attributes**: module-level assignments, by value type and visibility
//!
//! All results are sorted by name.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pydiscoverlib::{ClassQuery, ClassSignature, Discovery, Exclude};
//!
//! let query = ClassQuery::new()
//!     .signature(ClassSignature::subclass_of("Plugin"))
//!     .exclude(Exclude::predicate(|c| c.name.starts_with("Abstract")));
//!
//! let plugins = Discovery::new().discover_classes("src/plugins", &query)?;
//! ```

pub(crate) mod annotation;
pub mod attributes;
pub mod members;
pub mod options;
pub mod scanner;
pub mod signature;

pub use attributes::Attribute;
pub use members::{discover_classes, discover_functions, Exclude, Exclusion};
pub use options::{AttributeQuery, ClassQuery, DiscoverOptions, FunctionQuery};
pub use scanner::{discover_attributes, match_attribute, AttributeMatch};
pub use signature::{ClassSignature, FunctionSignature, ValueSignature};
