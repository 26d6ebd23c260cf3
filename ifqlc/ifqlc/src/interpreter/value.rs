use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, Utc};
use enum_as_inner::EnumAsInner;
use ifqlc_parser::error::codes;
use regex::Regex;

use super::ScopeId;
use crate::query::{FunctionEntry, OperationId};
use crate::semantic::{FunctionExpression, Kind, Literal};
use crate::time::Duration;
use crate::{Error, Result, WithErrorInfo};

/// A runtime value of the interpreter.
#[derive(Debug, Clone, EnumAsInner)]
pub enum Value {
    String(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Duration(Duration),
    Regex(Regex),
    Function(Function),
    Array(Array),
    /// Objects and imported packages.
    Map(BTreeMap<String, Value>),
    /// The result of the operation with this id.
    Table(OperationId),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::String(_) => Kind::String,
            Value::Int(_) => Kind::Int,
            Value::UInt(_) => Kind::UInt,
            Value::Float(_) => Kind::Float,
            Value::Bool(_) => Kind::Bool,
            Value::Time(_) => Kind::Time,
            Value::Duration(_) => Kind::Duration,
            Value::Regex(_) => Kind::Regex,
            Value::Function(_) => Kind::Function,
            Value::Array(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Table(_) => Kind::Table,
        }
    }

    /// Scopes captured by the functions in this value, including functions
    /// nested in arrays and maps.
    pub(crate) fn captured_scopes(&self, scopes: &mut Vec<ScopeId>) {
        match self {
            Value::Function(Function::Arrow(arrow) | Function::Resolve(arrow)) => {
                scopes.push(arrow.scope)
            }
            Value::Array(array) => {
                for element in &array.elements {
                    element.captured_scopes(scopes);
                }
            }
            Value::Map(map) => {
                for value in map.values() {
                    value.captured_scopes(scopes);
                }
            }
            _ => {}
        }
    }

    pub fn from_literal(literal: &Literal) -> Result<Value> {
        Ok(match literal {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Integer(i) => Value::Int(*i),
            Literal::UnsignedInteger(u) => Value::UInt(*u),
            Literal::Float(f) => Value::Float(*f),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::DateTime(t) => Value::Time(*t),
            Literal::Duration(d) => Value::Duration(*d),
            Literal::Regexp(pattern) => Value::Regex(compile_regex(pattern)?),
        })
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        Error::new_simple(format!("invalid regular expression /{pattern}/: {e}"))
            .with_code(codes::SEMANTIC)
    })
}

/// A list of values that all have the same kind. The kind of an empty array
/// is [Kind::Invalid].
#[derive(Debug, Clone, Default)]
pub struct Array {
    pub kind: Kind,
    pub elements: Vec<Value>,
}

impl Array {
    pub fn new(elements: Vec<Value>) -> Result<Array> {
        let mut kind = Kind::Invalid;
        for element in &elements {
            let element_kind = element.kind();
            if kind == Kind::Invalid {
                kind = element_kind;
            } else if kind != element_kind {
                return Err(Error::new_simple(format!(
                    "cannot mix types in an array, found both {kind} and {element_kind}"
                ))
                .with_code(codes::TYPE));
            }
        }
        Ok(Array { kind, elements })
    }

    /// The elements of an array of strings.
    pub fn as_strings(&self) -> Vec<String> {
        self.elements
            .iter()
            .filter_map(|v| v.as_string().cloned())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    /// A function defined in the program, with the scope it captured.
    Arrow(Rc<ArrowFunction>),
    /// A built-in that adds an operation. Methods of tables carry the table
    /// they were accessed on.
    Builtin {
        entry: FunctionEntry,
        parent: Option<OperationId>,
    },
    /// The `resolve` property of an arrow function.
    Resolve(Rc<ArrowFunction>),
}

#[derive(Debug)]
pub struct ArrowFunction {
    pub expr: FunctionExpression,
    pub scope: ScopeId,
}

impl Function {
    pub fn arrow(expr: FunctionExpression, scope: ScopeId) -> Self {
        Function::Arrow(Rc::new(ArrowFunction { expr, scope }))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}u"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Duration(d) => write!(f, "{d}"),
            Value::Regex(r) => write!(f, "/{}/", r.as_str()),
            Value::Function(Function::Arrow(arrow)) => {
                write!(f, "{}", crate::semantic::Expression::new(arrow.expr.clone()))
            }
            Value::Function(Function::Builtin { entry, .. }) => write!(f, "{}()", entry.name),
            Value::Function(Function::Resolve(_)) => f.write_str("resolve()"),
            Value::Array(array) => {
                f.write_str("[")?;
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Table(id) => write!(f, "table({id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_array_kind() {
        let array = Array::new(vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(array.kind, Kind::Int);

        let empty = Array::new(Vec::new()).unwrap();
        assert_eq!(empty.kind, Kind::Invalid);

        let error = Array::new(vec![Value::Int(1), Value::String("a".into())]).unwrap_err();
        assert_snapshot!(error.to_string(), @"cannot mix types in an array, found both int and string");
    }

    #[test]
    fn test_display() {
        let map = BTreeMap::from([
            ("b".to_string(), Value::Duration(Duration::from_secs(90))),
            (
                "a".to_string(),
                Value::Array(Array::new(vec![Value::UInt(1), Value::UInt(2)]).unwrap()),
            ),
        ]);
        assert_snapshot!(Value::Map(map).to_string(), @"{a: [1u, 2u], b: 1m30s}");
    }

    #[test]
    fn test_invalid_regex_literal() {
        let error = Value::from_literal(&Literal::Regexp("(".to_string())).unwrap_err();
        assert!(error.to_string().starts_with("invalid regular expression /(/"));
    }
}
