//! The operators of the language, applied to values.

use std::cmp::Ordering;

use ifqlc_parser::error::codes;

use super::Value;
use crate::semantic::Operator;
use crate::utils::Number;
use crate::{Error, Result, WithErrorInfo};

pub(crate) fn eval_binary(operator: Operator, left: &Value, right: &Value) -> Result<Value> {
    use Operator::*;

    let result = match operator {
        Addition | Subtraction | Multiplication | Division => {
            return arithmetic(operator, left, right)
        }
        LessThan | LessThanEqual | GreaterThan | GreaterThanEqual | Equal | NotEqual => {
            compare(operator, left, right).map(Value::Bool)
        }
        StartsWith => match (left, right) {
            (Value::String(l), Value::String(r)) => Some(Value::Bool(l.starts_with(r.as_str()))),
            _ => None,
        },
        RegexpMatch | RegexpNotMatch => match (left, right) {
            (Value::String(l), Value::Regex(r)) => {
                Some(Value::Bool(r.is_match(l) == (operator == RegexpMatch)))
            }
            _ => None,
        },
        In => match right {
            Value::Array(array) => Some(Value::Bool(
                array
                    .elements
                    .iter()
                    .any(|element| compare(Equal, left, element) == Some(true)),
            )),
            _ => None,
        },
        And | Or | Not | Empty | NotEmpty => None,
    };

    result.ok_or_else(|| unsupported(operator, left, right))
}

pub(crate) fn eval_unary(operator: Operator, value: &Value) -> Result<Value> {
    match (operator, value) {
        (Operator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),

        (Operator::Subtraction, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (Operator::Subtraction, Value::Float(f)) => Ok(Value::Float(-f)),
        (Operator::Subtraction, Value::Duration(d)) => {
            d.checked_neg().map(Value::Duration).ok_or_else(overflow)
        }

        (Operator::Empty | Operator::NotEmpty, _) => {
            let empty = match value {
                Value::String(s) => s.is_empty(),
                Value::Array(array) => array.elements.is_empty(),
                Value::Map(map) => map.is_empty(),
                _ => return Err(unsupported_unary(operator, value)),
            };
            Ok(Value::Bool(empty == (operator == Operator::Empty)))
        }

        _ => Err(unsupported_unary(operator, value)),
    }
}

fn arithmetic(operator: Operator, left: &Value, right: &Value) -> Result<Value> {
    use Operator::*;

    Ok(match (operator, left, right) {
        (_, Value::Int(l), Value::Int(r)) => Value::Int(match operator {
            Addition => l.wrapping_add(*r),
            Subtraction => l.wrapping_sub(*r),
            Multiplication => l.wrapping_mul(*r),
            _ => l.checked_div(*r).ok_or_else(division_by_zero)?,
        }),
        (_, Value::UInt(l), Value::UInt(r)) => Value::UInt(match operator {
            Addition => l.wrapping_add(*r),
            Subtraction => l.wrapping_sub(*r),
            Multiplication => l.wrapping_mul(*r),
            _ => l.checked_div(*r).ok_or_else(division_by_zero)?,
        }),
        (_, Value::Float(l), Value::Float(r)) => Value::Float(match operator {
            Addition => l + r,
            Subtraction => l - r,
            Multiplication => l * r,
            _ => l / r,
        }),

        (Addition, Value::String(l), Value::String(r)) => Value::String(format!("{l}{r}")),

        (Addition, Value::Duration(l), Value::Duration(r)) => {
            Value::Duration(l.checked_add(*r).ok_or_else(overflow)?)
        }
        (Subtraction, Value::Duration(l), Value::Duration(r)) => {
            Value::Duration(l.checked_sub(*r).ok_or_else(overflow)?)
        }
        (Addition | Subtraction, Value::Time(t), Value::Duration(d)) => {
            let d = if operator == Subtraction {
                d.checked_neg().ok_or_else(overflow)?
            } else {
                *d
            };
            let time = t
                .checked_add_signed(chrono::Duration::nanoseconds(d.nanoseconds()))
                .ok_or_else(|| Error::new_simple("time is out of range"))?;
            Value::Time(time)
        }

        _ => return Err(unsupported(operator, left, right)),
    })
}

/// Compares two values. `None` when the kinds can't be compared.
pub(crate) fn compare(operator: Operator, left: &Value, right: &Value) -> Option<bool> {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Time(l), Value::Time(r)) => Some(l.cmp(r)),
        (Value::Duration(l), Value::Duration(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => {
            // booleans only support equality
            return match operator {
                Operator::Equal => Some(l == r),
                Operator::NotEqual => Some(l != r),
                _ => None,
            };
        }
        (l, r) => {
            let (l, r) = (number(l)?, number(r)?);
            l.partial_cmp(&r)
        }
    };

    // an unordered pair (NaN) is only ever unequal
    let Some(ordering) = ordering else {
        return Some(operator == Operator::NotEqual);
    };

    Some(match operator {
        Operator::Equal => ordering == Ordering::Equal,
        Operator::NotEqual => ordering != Ordering::Equal,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::LessThanEqual => ordering != Ordering::Greater,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::GreaterThanEqual => ordering != Ordering::Less,
        _ => return None,
    })
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::UInt(u) => Some(Number::UInt(*u)),
        Value::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

fn unsupported(operator: Operator, left: &Value, right: &Value) -> Error {
    Error::new_simple(format!(
        "unsupported binary expression {} {operator} {}",
        left.kind(),
        right.kind()
    ))
    .with_code(codes::TYPE)
}

fn unsupported_unary(operator: Operator, value: &Value) -> Error {
    Error::new_simple(format!(
        "unsupported unary expression {operator} {}",
        value.kind()
    ))
    .with_code(codes::TYPE)
}

fn overflow() -> Error {
    Error::new_simple("duration is out of range")
}

fn division_by_zero() -> Error {
    Error::new_simple("integer division by zero")
}
