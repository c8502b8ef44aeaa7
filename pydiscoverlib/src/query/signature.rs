//! Signatures used to filter discovered members.
//!
//! Signatures are written the way they appear in annotations:
//!
//! | Signature | Examples |
//! |-----------|----------|
//! | [`ClassSignature`] | `Any`, `Plugin`, `str` |
//! | [`ValueSignature`] | `Any`, `int`, `Optional[str]`, `Union[int, str]`, `int \| None` |
//! | [`FunctionSignature`] | `Callable`, `(int, float) -> str`, `Callable[[int, float], str]` |

use std::fmt;
use std::str::FromStr;

use crate::error::DiscoverError;
use crate::loader::{Function, ParameterKind, Value, ValueType};

use super::annotation::{is_identifier, matching_close, split_top_level, top_level_positions};

/// Base class a discovered class must derive from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ClassSignature {
    /// Every class passes
    #[default]
    Any,
    /// Classes named like this, or deriving from a class named like this
    Subclass(String),
}

impl ClassSignature {
    pub fn subclass_of(name: impl Into<String>) -> Self {
        ClassSignature::Subclass(name.into())
    }
}

impl FromStr for ClassSignature {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        match name {
            "" | "Any" | "typing.Any" => Ok(ClassSignature::Any),
            name => {
                let simple = name.split('[').next().unwrap_or(name).trim();
                let simple = simple.rsplit('.').next().unwrap_or(simple);
                if !is_identifier(simple) {
                    return Err(DiscoverError::invalid(format!("invalid class signature: {}", name)));
                }
                Ok(ClassSignature::Subclass(simple.to_string()))
            }
        }
    }
}

impl fmt::Display for ClassSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSignature::Any => f.write_str("Any"),
            ClassSignature::Subclass(name) => f.write_str(name),
        }
    }
}

/// Type a value must have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ValueSignature {
    /// Every value passes
    #[default]
    Any,
    /// Values that are an instance of one of these types
    OneOf(Vec<ValueType>),
}

impl ValueSignature {
    /// Signature of a single type.
    pub fn of(ty: ValueType) -> Self {
        ValueSignature::OneOf(vec![ty])
    }

    /// Whether a value of type `ty` passes an instance check.
    pub fn accepts_type(&self, ty: ValueType) -> bool {
        match self {
            ValueSignature::Any => true,
            ValueSignature::OneOf(types) => types.iter().any(|t| ty.is_instance_of(*t)),
        }
    }

    pub fn accepts_value(&self, value: &Value) -> bool {
        self.accepts_type(value.value_type())
    }

    /// Whether everything this signature allows may be passed where
    /// `declared` is annotated. `Any` on either side is a wildcard.
    fn assignable_to(&self, declared: &ValueSignature) -> bool {
        match (self, declared) {
            (ValueSignature::Any, _) | (_, ValueSignature::Any) => true,
            (ValueSignature::OneOf(ours), ValueSignature::OneOf(theirs)) => ours
                .iter()
                .all(|ty| theirs.iter().any(|t| ty.is_assignable_to(*t))),
        }
    }
}

impl FromStr for ValueSignature {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if matches!(text, "" | "Any" | "typing.Any") {
            return Ok(ValueSignature::Any);
        }

        let union = top_level_positions(text, '|');
        if !union.is_empty() {
            return union_of(split_top_level(text, '|'));
        }

        let (head, args) = match (text.find('['), text.strip_suffix(']')) {
            (Some(open), Some(inner)) => (&text[..open], Some(&inner[open + 1..])),
            _ => (text, None),
        };
        let head = head.trim();
        let head = head.rsplit('.').next().unwrap_or(head);

        match (head, args) {
            ("Optional", Some(args)) => {
                let mut signature = args.parse::<ValueSignature>()?;
                if let ValueSignature::OneOf(types) = &mut signature {
                    types.push(ValueType::NoneType);
                }
                Ok(signature)
            }
            ("Union", Some(args)) => union_of(split_top_level(args, ',')),
            _ => Ok(ValueSignature::of(text.parse()?)),
        }
    }
}

fn union_of(members: Vec<&str>) -> Result<ValueSignature, DiscoverError> {
    let mut types = Vec::new();
    for member in members {
        match member.parse::<ValueSignature>()? {
            ValueSignature::Any => return Ok(ValueSignature::Any),
            ValueSignature::OneOf(more) => types.extend(more),
        }
    }
    types.dedup();
    Ok(ValueSignature::OneOf(types))
}

impl fmt::Display for ValueSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSignature::Any => f.write_str("Any"),
            ValueSignature::OneOf(types) => {
                let names: Vec<&str> = types.iter().map(ValueType::as_str).collect();
                f.write_str(&names.join(" | "))
            }
        }
    }
}

/// Call shape a discovered function must accept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FunctionSignature {
    /// Every function passes
    #[default]
    Callable,
    /// Functions callable with these argument types and returning a
    /// compatible type
    Accepts {
        parameters: Vec<ValueSignature>,
        returns: ValueSignature,
    },
}

impl FunctionSignature {
    pub fn new(parameters: Vec<ValueSignature>, returns: ValueSignature) -> Self {
        FunctionSignature::Accepts { parameters, returns }
    }

    /// Whether `function` can be called with the requested arguments and its
    /// result used as the requested return type.
    ///
    /// Missing annotations accept anything. Annotations that do not name a
    /// known type only accept `Any`.
    pub fn matches(&self, function: &Function) -> bool {
        let FunctionSignature::Accepts { parameters, returns } = self else {
            return true;
        };

        let declared = function.call_parameters();
        let positional: Vec<_> = declared
            .iter()
            .filter(|p| p.kind == ParameterKind::Positional)
            .collect();
        let variadic = declared
            .iter()
            .find(|p| p.kind == ParameterKind::VarPositional);
        let required = positional.iter().filter(|p| p.default.is_none()).count();
        let required_keywords = declared
            .iter()
            .any(|p| p.kind == ParameterKind::KeywordOnly && p.default.is_none());

        if parameters.len() < required || required_keywords {
            return false;
        }
        if parameters.len() > positional.len() && variadic.is_none() {
            return false;
        }

        for (index, requested) in parameters.iter().enumerate() {
            let target = positional.get(index).copied().or(variadic);
            let hint = target.and_then(|p| p.hint.as_deref());
            let accepted = match declared_signature(hint) {
                Some(declared) => requested.assignable_to(&declared),
                None => *requested == ValueSignature::Any,
            };
            if !accepted {
                return false;
            }
        }

        match declared_signature(function.returns.as_deref()) {
            Some(declared) => declared.assignable_to(returns),
            None => *returns == ValueSignature::Any,
        }
    }
}

/// Signature of an annotation. A missing annotation accepts anything, one
/// that names no known type gives `None`.
fn declared_signature(hint: Option<&str>) -> Option<ValueSignature> {
    match hint {
        None => Some(ValueSignature::Any),
        Some(hint) => hint.parse().ok(),
    }
}

impl FromStr for FunctionSignature {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if matches!(text, "" | "Callable" | "typing.Callable") {
            return Ok(FunctionSignature::Callable);
        }
        let invalid = || DiscoverError::invalid(format!("invalid function signature: {}", text));

        // Callable[[int, float], str]
        if let Some(inner) = text
            .strip_prefix("Callable[")
            .or_else(|| text.strip_prefix("typing.Callable["))
        {
            let inner = inner.strip_suffix(']').ok_or_else(invalid)?;
            let parts = split_top_level(inner, ',');
            let [arguments, returns] = parts.as_slice() else {
                return Err(invalid());
            };
            if *arguments == "..." {
                return Ok(FunctionSignature::Callable);
            }
            let arguments = arguments
                .strip_prefix('[')
                .and_then(|a| a.strip_suffix(']'))
                .ok_or_else(invalid)?;
            return Ok(FunctionSignature::new(parse_list(arguments)?, returns.parse()?));
        }

        // (int, float) -> str
        if !text.starts_with('(') {
            return Err(invalid());
        }
        let close = matching_close(text).ok_or_else(invalid)?;
        let arguments = &text[1..close];
        let rest = text[close + 1..].trim();
        let returns = match rest.strip_prefix("->") {
            Some(returns) => returns.parse()?,
            None if rest.is_empty() => ValueSignature::Any,
            None => return Err(invalid()),
        };
        Ok(FunctionSignature::new(parse_list(arguments)?, returns))
    }
}

fn parse_list(text: &str) -> Result<Vec<ValueSignature>, DiscoverError> {
    split_top_level(text, ',')
        .into_iter()
        .map(str::parse)
        .collect()
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionSignature::Callable => f.write_str("Callable"),
            FunctionSignature::Accepts { parameters, returns } => {
                let parameters: Vec<String> = parameters.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", parameters.join(", "), returns)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Module;

    fn function(source: &str) -> Function {
        Module::from_source("pkg.mod", source).unwrap().functions()[0].clone()
    }

    #[test]
    fn test_parse_value_signatures() {
        assert_eq!("Any".parse::<ValueSignature>().unwrap(), ValueSignature::Any);
        assert_eq!(
            "int".parse::<ValueSignature>().unwrap(),
            ValueSignature::of(ValueType::Int)
        );
        assert_eq!(
            "Optional[str]".parse::<ValueSignature>().unwrap(),
            ValueSignature::OneOf(vec![ValueType::Str, ValueType::NoneType])
        );
        assert_eq!(
            "Union[int, str]".parse::<ValueSignature>().unwrap(),
            ValueSignature::OneOf(vec![ValueType::Int, ValueType::Str])
        );
        assert_eq!(
            "int | None".parse::<ValueSignature>().unwrap(),
            ValueSignature::OneOf(vec![ValueType::Int, ValueType::NoneType])
        );
        assert!("Widget".parse::<ValueSignature>().is_err());
    }

    #[test]
    fn test_value_signature_accepts() {
        let int = ValueSignature::of(ValueType::Int);

        assert!(int.accepts_value(&Value::Int(1)));
        assert!(int.accepts_value(&Value::Bool(true)));
        assert!(!int.accepts_value(&Value::Float(1.0)));
        assert!(ValueSignature::Any.accepts_value(&Value::None));
    }

    #[test]
    fn test_parse_class_signatures() {
        assert_eq!("Any".parse::<ClassSignature>().unwrap(), ClassSignature::Any);
        assert_eq!(
            "plugins.base.Plugin".parse::<ClassSignature>().unwrap(),
            ClassSignature::subclass_of("Plugin")
        );
        assert!("not a class".parse::<ClassSignature>().is_err());
    }

    #[test]
    fn test_parse_function_signatures() {
        let expected = FunctionSignature::new(
            vec![ValueSignature::of(ValueType::Int), ValueSignature::of(ValueType::Float)],
            ValueSignature::of(ValueType::Str),
        );

        assert_eq!("(int, float) -> str".parse::<FunctionSignature>().unwrap(), expected);
        assert_eq!(
            "Callable[[int, float], str]".parse::<FunctionSignature>().unwrap(),
            expected
        );
        assert_eq!(
            "Callable".parse::<FunctionSignature>().unwrap(),
            FunctionSignature::Callable
        );
        assert_eq!(expected.to_string(), "(int, float) -> str");
        assert!("int -> str".parse::<FunctionSignature>().is_err());
    }

    #[test]
    fn test_function_matching() {
        let signature: FunctionSignature = "(int, float) -> str".parse().unwrap();

        assert!(signature.matches(&function("def f(x: int, y: float) -> str:\n    pass\n")));
        assert!(signature.matches(&function("def f(x: float, y) -> str:\n    pass\n")));
        assert!(signature.matches(&function("def f(x, y, z=1):\n    pass\n")));
        assert!(signature.matches(&function("def f(*args: float) -> str:\n    pass\n")));
        assert!(!signature.matches(&function("def f(x: float, y: int) -> int:\n    pass\n")));
        assert!(!signature.matches(&function("def f(x: int) -> str:\n    pass\n")));
        assert!(!signature.matches(&function("def f(x, y, *, key):\n    pass\n")));
        assert!(!signature.matches(&function("def f(x: int, y: float) -> Widget:\n    pass\n")));
    }

    #[test]
    fn test_return_type_covariance() {
        let signature: FunctionSignature = "() -> float".parse().unwrap();

        assert!(signature.matches(&function("def f() -> int:\n    pass\n")));
        assert!(!signature.matches(&function("def f() -> Optional[int]:\n    pass\n")));
    }
}
