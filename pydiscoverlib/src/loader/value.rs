//! Values bound at module level.
//!
//! Loading a module never evaluates code. The right-hand side of a
//! module-level assignment is classified from its syntax tree instead:
//! literals (`None`, `True`, `42`, `1.5`, `'text'`, `b'raw'`) become concrete
//! values, containers and f-strings keep their text together with their
//! type, and everything else is an opaque object.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rustpython_parser::ast;
use serde::{Deserialize, Serialize};

use crate::error::DiscoverError;

use super::syntax::{parse_expression, text_of};

/// Runtime type of a module-level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Tuple,
    Dict,
    Set,
    /// Any value whose type cannot be told from its source text
    Object,
}

impl ValueType {
    /// Whether a value of this type passes an `isinstance` check against
    /// `other`.
    ///
    /// `bool` is a subclass of `int`, and every type is an `object`.
    pub fn is_instance_of(self, other: ValueType) -> bool {
        self == other
            || other == ValueType::Object
            || (self == ValueType::Bool && other == ValueType::Int)
    }

    /// Whether a value of this type is accepted where `other` is annotated.
    ///
    /// Like [`is_instance_of`](Self::is_instance_of), plus `int` (and so
    /// `bool`) is accepted where `float` is expected.
    pub fn is_assignable_to(self, other: ValueType) -> bool {
        self.is_instance_of(other)
            || (other == ValueType::Float && matches!(self, ValueType::Int | ValueType::Bool))
    }

    /// Python name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::NoneType => "NoneType",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "str",
            ValueType::Bytes => "bytes",
            ValueType::List => "list",
            ValueType::Tuple => "tuple",
            ValueType::Dict => "dict",
            ValueType::Set => "set",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = DiscoverError;

    /// Parse a type name as written in an annotation.
    ///
    /// Generic parameters are ignored: `List[int]` is a `list`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.split('[').next().unwrap_or(name).trim();
        let name = name.rsplit('.').next().unwrap_or(name);
        match name {
            "None" | "NoneType" => Ok(ValueType::NoneType),
            "bool" => Ok(ValueType::Bool),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "str" => Ok(ValueType::Str),
            "bytes" => Ok(ValueType::Bytes),
            "list" | "List" => Ok(ValueType::List),
            "tuple" | "Tuple" => Ok(ValueType::Tuple),
            "dict" | "Dict" => Ok(ValueType::Dict),
            "set" | "Set" => Ok(ValueType::Set),
            "object" => Ok(ValueType::Object),
            other => Err(DiscoverError::invalid(format!("unknown type: {}", other))),
        }
    }
}

/// A module-level value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(String),
    /// A value that is recognised but not evaluated
    Expr { text: String, ty: ValueType },
}

impl Value {
    /// The runtime type of the value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::NoneType,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::Str,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Expr { ty, .. } => *ty,
        }
    }

    /// Classify the right-hand side of an assignment.
    ///
    /// A bare name that is already bound in `namespace` takes that binding's
    /// value. Text that is not a single expression is an opaque object.
    pub fn classify(text: &str, namespace: &BTreeMap<String, Value>) -> Value {
        let text = text.trim();
        match parse_expression(text) {
            Some(expr) => Value::from_expr(&expr, text, namespace),
            None => Value::expr(text, ValueType::Object),
        }
    }

    /// Classify a parsed expression; `source` is the text its range points into.
    pub(crate) fn from_expr(expr: &ast::Expr, source: &str, namespace: &BTreeMap<String, Value>) -> Value {
        let text = text_of(source, expr);
        match expr {
            ast::Expr::Constant(ast::ExprConstant { value, .. }) => from_constant(value, text),
            ast::Expr::UnaryOp(ast::ExprUnaryOp { op, operand, .. }) if is_constant(operand) => {
                match (op, Value::from_expr(operand, source, namespace)) {
                    (ast::UnaryOp::USub, Value::Int(v)) => match v.checked_neg() {
                        Some(negated) => Value::Int(negated),
                        None => Value::expr(text, ValueType::Int),
                    },
                    (ast::UnaryOp::USub, Value::Float(v)) => Value::Float(-v),
                    (ast::UnaryOp::USub | ast::UnaryOp::UAdd, Value::Expr { ty: ValueType::Int, .. }) => {
                        Value::expr(text, ValueType::Int)
                    }
                    (ast::UnaryOp::UAdd, value @ (Value::Int(_) | Value::Float(_))) => value,
                    _ => Value::expr(text, ValueType::Object),
                }
            }
            ast::Expr::JoinedStr(_) => Value::expr(text, ValueType::Str),
            ast::Expr::List(_) | ast::Expr::ListComp(_) => Value::expr(text, ValueType::List),
            ast::Expr::Tuple(_) => Value::expr(text, ValueType::Tuple),
            ast::Expr::Dict(_) | ast::Expr::DictComp(_) => Value::expr(text, ValueType::Dict),
            ast::Expr::Set(_) | ast::Expr::SetComp(_) => Value::expr(text, ValueType::Set),
            ast::Expr::Name(ast::ExprName { id, .. }) => match namespace.get(id.as_str()) {
                Some(bound) => bound.clone(),
                None => Value::expr(text, ValueType::Object),
            },
            _ => Value::expr(text, ValueType::Object),
        }
    }

    pub(crate) fn expr(text: &str, ty: ValueType) -> Value {
        Value::Expr {
            text: text.to_string(),
            ty,
        }
    }
}

fn is_constant(expr: &ast::Expr) -> bool {
    matches!(expr, ast::Expr::Constant(_))
}

fn from_constant(constant: &ast::Constant, text: &str) -> Value {
    match constant {
        ast::Constant::None => Value::None,
        ast::Constant::Bool(v) => Value::Bool(*v),
        // Python ints are unbounded; keep the text when it does not fit
        ast::Constant::Int(v) => match v.to_string().parse::<i64>() {
            Ok(v) => Value::Int(v),
            Err(_) => Value::expr(text, ValueType::Int),
        },
        ast::Constant::Float(v) => Value::Float(*v),
        ast::Constant::Str(v) => Value::Str(v.clone()),
        ast::Constant::Bytes(v) => Value::Bytes(String::from_utf8_lossy(v).into_owned()),
        ast::Constant::Tuple(_) => Value::expr(text, ValueType::Tuple),
        _ => Value::expr(text, ValueType::Object),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "b{:?}", v),
            Value::Expr { text, .. } => write!(f, "{}", text),
        }
    }
}
