//! Attribute scanner.
//!
//! Attributes are found line by line with a regular expression, not by
//! parsing: each raw source line that looks like
//!
//! ```text
//! name [: hint] = value [# comment]
//! ```
//!
//! is a candidate. The value of a candidate is looked up by name in the
//! module's namespace. Names that are not bound there (locals, class
//! attributes, deleted names) are skipped.
//!
//! A candidate directly below a closed `"""` or `'''` block gets the block's
//! text as its `doc`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::loader::Module;
use crate::session::Discovery;
use crate::source::Source;
use crate::Result;

use super::attributes::Attribute;
use super::options::AttributeQuery;

static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*",
        r"([a-zA-Z_]+[a-zA-Z_0-9]*)", // name
        r"(\s*:\s*(\w+)\s*)?",        // hint
        r"\s*=\s*",
        r"(.+?)", // value
        r"\s*",
        r"(#\s*(.*?)\s*)?", // comment
        r"$",
    ))
    .unwrap()
});

const DOC_DELIMITERS: [&str; 2] = ["\"\"\"", "'''"];

/// The parts of a line that declares an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub hint: Option<String>,
    /// Right-hand side as written, trimmed
    pub value: String,
    pub comment: Option<String>,
}

/// Match a single source line against the attribute pattern.
pub fn match_attribute(line: &str) -> Option<AttributeMatch> {
    let caps = ATTRIBUTE_PATTERN.captures(line)?;
    let group = |index: usize| caps.get(index).map(|m| m.as_str().to_string());

    Some(AttributeMatch {
        name: group(1)?,
        hint: group(3),
        value: group(4)?,
        comment: group(6),
    })
}

/// Text of the block string that closes right above a line.
///
/// `preceding` holds every line before it. Blank lines between the block
/// and the line are allowed.
fn find_doc(preceding: &[&str]) -> Option<String> {
    let end = preceding.iter().rposition(|line| !line.trim().is_empty())?;
    let last = preceding[end].trim_end();

    for delimiter in DOC_DELIMITERS {
        let Some(before_close) = last.strip_suffix(delimiter) else {
            continue;
        };

        // Opened on the same line
        if let Some(open) = before_close.rfind(delimiter) {
            return Some(before_close[open + delimiter.len()..].trim().to_string());
        }

        let mut parts = vec![before_close];
        for line in preceding[..end].iter().rev() {
            match line.rfind(delimiter) {
                Some(open) => {
                    parts.push(&line[open + delimiter.len()..]);
                    parts.reverse();
                    return Some(parts.join("\n").trim().to_string());
                }
                None => parts.push(line),
            }
        }
        return None;
    }

    None
}

/// Scan one module for attribute declarations, in line order.
fn scan_module(module: &Module) -> Vec<Attribute> {
    let lines: Vec<&str> = module.source().lines().collect();
    let mut attributes = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(found) = match_attribute(line) else {
            continue;
        };
        let Some(value) = module.getattr(&found.name) else {
            trace!(
                module = module.name(),
                line = index + 1,
                name = %found.name,
                "skipping assignment to a name the module does not bind"
            );
            continue;
        };

        attributes.push(Attribute {
            declared_type: value.value_type(),
            value: value.clone(),
            doc: find_doc(&lines[..index]),
            comment: found.comment,
            hint: found.hint,
            module: Some(module.clone()),
            assigned_value: found.value,
            line: line.to_string(),
            line_nr: index + 1,
            name: found.name,
        });
    }

    attributes
}

impl Discovery {
    /// Return the attributes declared in the modules of `source`, sorted by
    /// name.
    ///
    /// Attributes with the same name keep their scan order: by line within a
    /// module, then by module. Module visibility only applies when a path is
    /// discovered; modules given explicitly are always scanned.
    pub fn discover_attributes(
        &mut self,
        source: impl Into<Source>,
        query: &AttributeQuery,
    ) -> Result<Vec<Attribute>> {
        let source = source.into();
        let options = &query.options;
        let modules =
            self.resolve_source_modules(&source, options.in_private_modules, options.raise_on_fail)?;

        let mut attributes: Vec<Attribute> = modules
            .iter()
            .flat_map(scan_module)
            .filter(|attribute| query.signature.accepts_value(&attribute.value))
            .filter(|attribute| options.admits_member(attribute.is_private()))
            .collect();

        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attributes)
    }
}

/// Return the attributes declared in the modules of `source`, sorted by name.
pub fn discover_attributes(source: impl Into<Source>, query: &AttributeQuery) -> Result<Vec<Attribute>> {
    Discovery::new().discover_attributes(source, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{Value, ValueType};
    use crate::query::signature::ValueSignature;

    const SETTINGS: &str = r#""""Settings."""

"""
Sample rate in Hz.
"""
RATE: int = 44100  # samples per second

'''Channel count.'''
CHANNELS = 2
NAME = "mixer"
_secret = b"key"
DEBUG = True
ALIAS = RATE
BUFFER = [0] * 1024

def configure(level):
    verbose = level > 1
    return verbose


class Mixer:
    gain = 0.5

REMOVED = 1
del REMOVED
"#;

    fn settings() -> Module {
        Module::from_source("audio.settings", SETTINGS).unwrap()
    }

    #[test]
    fn test_match_attribute() {
        let plain = match_attribute("  some_attr   =     2  ").unwrap();
        let hinted = match_attribute("  some_attr  :  int  =   2  ").unwrap();
        let commented = match_attribute("  some_attr  :  int  =   2  #   bla bla bla!   ").unwrap();

        assert_eq!(plain.name, "some_attr");
        assert_eq!(plain.hint, None);
        assert_eq!(plain.value, "2");
        assert_eq!(plain.comment, None);
        assert_eq!(hinted.hint.as_deref(), Some("int"));
        assert_eq!(hinted.value, "2");
        assert_eq!(commented.hint.as_deref(), Some("int"));
        assert_eq!(commented.comment.as_deref(), Some("bla bla bla!"));
    }

    #[test]
    fn test_non_matches() {
        assert!(match_attribute("print(x)").is_none());
        assert!(match_attribute("def f(x=1):").is_none());
        assert!(match_attribute("obj.attr = 1").is_none());
        assert!(match_attribute("x: List[int] = []").is_none());
        assert!(match_attribute("x =").is_none());
    }

    #[test]
    fn test_find_doc() {
        assert_eq!(find_doc(&["\"\"\"Doc.\"\"\""]).as_deref(), Some("Doc."));
        assert_eq!(
            find_doc(&["x = 1", "'''", "  first", "  second", "'''", ""]).as_deref(),
            Some("first\n  second")
        );
        assert_eq!(find_doc(&["\"\"\"Doc.\"\"\"", "x = 1"]), None);
        assert_eq!(find_doc(&[]), None);
    }

    #[test]
    fn test_discover_attributes_in_module() {
        let attributes = discover_attributes(settings(), &AttributeQuery::new()).unwrap();
        let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();

        assert_eq!(names, vec!["ALIAS", "BUFFER", "CHANNELS", "DEBUG", "NAME", "RATE"]);

        let rate = &attributes[5];
        assert_eq!(rate.value, Value::Int(44100));
        assert_eq!(rate.declared_type, ValueType::Int);
        assert_eq!(rate.hint.as_deref(), Some("int"));
        assert_eq!(rate.comment.as_deref(), Some("samples per second"));
        assert_eq!(rate.doc.as_deref(), Some("Sample rate in Hz."));
        assert_eq!(rate.assigned_value, "44100");
        assert_eq!(rate.line_nr, 6);
        assert!(rate.is_constant());

        assert_eq!(attributes[2].doc.as_deref(), Some("Channel count."));
        assert_eq!(attributes[0].value, Value::Int(44100));
        assert_eq!(attributes[1].declared_type, ValueType::Object);
    }

    #[test]
    fn test_unbound_names_are_skipped() {
        let attributes =
            discover_attributes(settings(), &AttributeQuery::new().include_privates(true)).unwrap();
        let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();

        assert!(!names.contains(&"verbose"));
        assert!(!names.contains(&"gain"));
        assert!(!names.contains(&"REMOVED"));
        assert!(names.contains(&"_secret"));
    }

    #[test]
    fn test_signature_filter() {
        let ints = discover_attributes(
            settings(),
            &AttributeQuery::new().signature(ValueSignature::of(ValueType::Int)),
        )
        .unwrap();
        let strs = discover_attributes(
            settings(),
            &AttributeQuery::new().signature(ValueSignature::of(ValueType::Str)),
        )
        .unwrap();
        let names: Vec<&str> = ints.iter().map(|a| a.name.as_str()).collect();

        // bool is an int
        assert_eq!(names, vec!["ALIAS", "CHANNELS", "DEBUG", "RATE"]);
        assert_eq!(strs.len(), 1);
        assert_eq!(strs[0].name, "NAME");
    }

    #[test]
    fn test_explicit_private_module_is_scanned() {
        let module = Module::from_source("pkg._settings", "LEVEL = 3\n").unwrap();

        let attributes = discover_attributes(&module, &AttributeQuery::new()).unwrap();

        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].value, Value::Int(3));
    }

    #[test]
    fn test_reassigned_name_resolves_to_last_binding() {
        let module = Module::from_source("pkg.counter", "COUNT = 1\nCOUNT = 'two'\n").unwrap();

        let attributes = discover_attributes(&module, &AttributeQuery::new()).unwrap();

        assert_eq!(attributes.len(), 2);
        assert!(attributes.iter().all(|a| a.value == Value::Str("two".to_string())));
        assert_eq!(attributes[0].line_nr, 1);
        assert_eq!(attributes[1].line_nr, 2);
    }
}
