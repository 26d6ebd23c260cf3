use std::collections::HashMap;

use chrono::{DateTime, Utc};
use enum_as_inner::EnumAsInner;

/// A dotted path from a function parameter to a value of the row, like
/// `r._value` or `r.tags.host`.
pub type ReferencePath = String;

/// The kinds of values a row function works with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    #[default]
    Invalid,
    Bool,
    Int,
    UInt,
    Float,
    String,
    Time,
    Map,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    Map(Map),
}

impl Value {
    pub fn kind(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::UInt(_) => Type::UInt,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::Time(_) => Type::Time,
            Value::Map(_) => Type::Map,
        }
    }
}

/// The value of an object expression. Properties keep the order in which
/// they were written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Map {
    pub properties: Vec<(String, Value)>,
}

impl Map {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

/// The keys and kinds of the map a function returns, known before it runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapMeta {
    pub properties: Vec<PropertyMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMeta {
    pub key: String,
    pub kind: Type,
}

/// The values of one row, by reference path.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: HashMap<ReferencePath, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<P: Into<ReferencePath>>(&mut self, path: P, value: Value) {
        self.values.insert(path.into(), value);
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    /// The kind of the value at `path`, [Type::Invalid] when there is none.
    pub fn kind(&self, path: &str) -> Type {
        self.get(path).map(Value::kind).unwrap_or_default()
    }
}

impl<P: Into<ReferencePath>> FromIterator<(P, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (P, Value)>>(iter: I) -> Self {
        Scope {
            values: iter.into_iter().map(|(p, v)| (p.into(), v)).collect(),
        }
    }
}
