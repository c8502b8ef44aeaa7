//! Module attributes found by the scanner.

use serde::{Serialize, Serializer};

use crate::loader::{Module, Value, ValueType};

fn serialize_module<S: Serializer>(module: &Option<Module>, serializer: S) -> Result<S::Ok, S::Error> {
    module.as_ref().map(Module::name).serialize(serializer)
}

/// A module-level assignment such as `RATE: int = 44100  # samples`.
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: String,
    /// Runtime type of `value`
    pub declared_type: ValueType,
    /// Value bound to `name` in the module
    pub value: Value,
    /// Block string right above the declaration
    pub doc: Option<String>,
    /// Trailing `#` comment
    pub comment: Option<String>,
    /// Annotation as written, not validated
    pub hint: Option<String>,
    /// Module the attribute was found in
    #[serde(serialize_with = "serialize_module")]
    pub module: Option<Module>,
    /// Right-hand side as written
    pub assigned_value: String,
    /// Full source line
    pub line: String,
    /// 1-based line number
    pub line_nr: usize,
}

impl Attribute {
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn is_public(&self) -> bool {
        !self.is_private()
    }

    /// A constant has at least one cased character and no lowercase ones.
    pub fn is_constant(&self) -> bool {
        self.name.chars().any(char::is_uppercase) && !self.name.chars().any(char::is_lowercase)
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.value == other.value
            && self.declared_type == other.declared_type
            && self.module == other.module
            && self.line_nr == other.line_nr
    }
}
