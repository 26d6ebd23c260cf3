use std::collections::{BTreeMap, HashMap, HashSet};

use ifqlc_parser::error::codes;

use super::{Array, Function, Value};
use crate::query::{to_query_time, OperationId};
use crate::semantic::Kind;
use crate::time::{Duration, Time};
use crate::{Error, Result, WithErrorInfo};

/// The keyword arguments of a call.
///
/// Tracks which arguments were read, so that a call can reject arguments the
/// function doesn't know about.
#[derive(Debug, Default)]
pub struct Arguments {
    values: HashMap<String, Value>,
    used: HashSet<String>,
}

macro_rules! typed_getters {
    ($($get:ident, $get_required:ident, $kind:ident, $ty:ty;)*) => {
        $(
            pub fn $get(&mut self, name: &str) -> Result<Option<$ty>> {
                match self.get(name) {
                    Some(Value::$kind(v)) => Ok(Some(v)),
                    Some(other) => Err(wrong_kind(name, Kind::$kind, &other)),
                    None => Ok(None),
                }
            }

            pub fn $get_required(&mut self, name: &str) -> Result<$ty> {
                self.$get(name)?.ok_or_else(|| missing(name))
            }
        )*
    };
}

impl Arguments {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Arguments {
            values,
            used: HashSet::new(),
        }
    }

    /// The argument with this name, marking it as used.
    pub fn get(&mut self, name: &str) -> Option<Value> {
        let value = self.values.get(name)?;
        self.used.insert(name.to_string());
        Some(value.clone())
    }

    pub fn get_required(&mut self, name: &str) -> Result<Value> {
        self.get(name).ok_or_else(|| missing(name))
    }

    typed_getters! {
        get_string, get_required_string, String, String;
        get_int, get_required_int, Int, i64;
        get_float, get_required_float, Float, f64;
        get_bool, get_required_bool, Bool, bool;
        get_duration, get_required_duration, Duration, Duration;
        get_function, get_required_function, Function, Function;
        get_map, get_required_map, Map, BTreeMap<String, Value>;
        get_table, get_required_table, Table, OperationId;
    }

    /// A bound of a time range: a time, a duration relative to now or unix
    /// seconds.
    pub fn get_time(&mut self, name: &str) -> Result<Option<Time>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        to_query_time(&value)
            .map(Some)
            .map_err(|e| e.with_code(codes::ARGUMENT))
    }

    pub fn get_required_time(&mut self, name: &str) -> Result<Time> {
        self.get_time(name)?.ok_or_else(|| missing(name))
    }

    /// An array whose elements are of `kind`. An empty array matches any
    /// kind.
    pub fn get_array(&mut self, name: &str, kind: Kind) -> Result<Option<Array>> {
        let array = match self.get(name) {
            Some(Value::Array(array)) => array,
            Some(other) => return Err(wrong_kind(name, Kind::Array, &other)),
            None => return Ok(None),
        };
        if array.kind != kind && array.kind != Kind::Invalid {
            return Err(Error::new_simple(format!(
                "keyword argument {name:?} should be of an array of type {kind}, but got an array of type {}",
                array.kind
            ))
            .with_code(codes::ARGUMENT));
        }
        Ok(Some(array))
    }

    pub fn get_required_array(&mut self, name: &str, kind: Kind) -> Result<Array> {
        self.get_array(name, kind)?.ok_or_else(|| missing(name))
    }

    /// Names of the arguments that were never read, sorted.
    pub fn unused(&self) -> Vec<&str> {
        let mut unused: Vec<_> = self
            .values
            .keys()
            .filter(|k| !self.used.contains(*k))
            .map(String::as_str)
            .collect();
        unused.sort_unstable();
        unused
    }
}

fn missing(name: &str) -> Error {
    Error::new_simple(format!("missing required keyword argument {name:?}"))
        .with_code(codes::ARGUMENT)
}

fn wrong_kind(name: &str, expected: Kind, found: &Value) -> Error {
    Error::new_simple(format!(
        "keyword argument {name:?} should be of type {expected}, but got {}",
        found.kind()
    ))
    .with_code(codes::ARGUMENT)
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn arguments(values: Vec<(&str, Value)>) -> Arguments {
        Arguments::new(
            values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_unused() {
        let mut args = arguments(vec![
            ("db", Value::String("mydb".into())),
            ("zeta", Value::Int(1)),
            ("alpha", Value::Int(2)),
        ]);
        assert_eq!(args.get_required_string("db").unwrap(), "mydb");
        assert_eq!(args.unused(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_errors() {
        let mut args = arguments(vec![("n", Value::String("five".into()))]);

        let error = args.get_required_int("limit").unwrap_err();
        assert_snapshot!(error.to_string(), @r#"missing required keyword argument "limit""#);
        assert_eq!(error.code, Some("E0004"));

        let error = args.get_int("n").unwrap_err();
        assert_snapshot!(error.to_string(), @r#"keyword argument "n" should be of type int, but got string"#);

        // a value of the wrong kind still counts as used
        assert!(args.unused().is_empty());
    }

    #[test]
    fn test_arrays() {
        let strings = Array::new(vec![Value::String("a".into())]).unwrap();
        let mut args = arguments(vec![
            ("by", Value::Array(strings)),
            ("empty", Value::Array(Array::default())),
        ]);

        let by = args.get_required_array("by", Kind::String).unwrap();
        assert_eq!(by.as_strings(), vec!["a"]);

        let error = args.get_array("by", Kind::Int).unwrap_err();
        assert_snapshot!(error.to_string(), @r#"keyword argument "by" should be of an array of type int, but got an array of type string"#);

        assert!(args.get_array("empty", Kind::Int).unwrap().is_some());
        assert!(args.get_array("missing", Kind::Int).unwrap().is_none());
    }

    #[test]
    fn test_time() {
        let mut args = arguments(vec![
            ("start", Value::Duration(Duration::from_hours(-1))),
            ("stop", Value::Bool(true)),
        ]);
        assert_eq!(
            args.get_required_time("start").unwrap(),
            Time::Relative(Duration::from_hours(-1))
        );
        assert_snapshot!(args.get_time("stop").unwrap_err().to_string(), @"value is not a time, got bool");
    }
}
