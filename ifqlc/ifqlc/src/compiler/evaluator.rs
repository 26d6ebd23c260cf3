use std::borrow::Cow;
use std::cmp::Ordering;

use ifqlc_parser::error::codes;

use super::value::{Map, MapMeta, PropertyMeta, ReferencePath, Scope, Type, Value};
use crate::semantic::Operator;
use crate::utils::Number;
use crate::{Error, Result, WithErrorInfo};

/// A compiled expression, with the kind of the value it produces.
#[derive(Debug, Clone)]
pub(super) struct Evaluator {
    pub kind: Type,
    node: Node,
}

#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Reference(ReferencePath),
    Block(Vec<Step>),
    Map {
        meta: MapMeta,
        properties: Vec<Evaluator>,
    },
    Not(Box<Evaluator>),
    Negate(Box<Evaluator>),
    Logical {
        and: bool,
        left: Box<Evaluator>,
        right: Box<Evaluator>,
    },
    Conditional {
        test: Box<Evaluator>,
        consequent: Box<Evaluator>,
        alternate: Box<Evaluator>,
    },
    Binary {
        function: BinaryFn,
        left: Box<Evaluator>,
        right: Box<Evaluator>,
    },
}

#[derive(Debug, Clone)]
pub(super) enum Step {
    Declare(ReferencePath, Evaluator),
    Expression(Evaluator),
    Return(Evaluator),
}

/// How a binary operator applies to operands of known kinds.
#[derive(Debug, Clone, Copy)]
enum BinaryFn {
    Arithmetic(Operator),
    Compare(Operator),
    Concat,
    StartsWith,
}

impl Evaluator {
    pub fn literal(value: Value) -> Self {
        Evaluator {
            kind: value.kind(),
            node: Node::Literal(value),
        }
    }

    pub fn reference(path: ReferencePath, kind: Type) -> Self {
        Evaluator {
            kind,
            node: Node::Reference(path),
        }
    }

    /// The steps of a block. The last one must be its return.
    pub fn block(steps: Vec<Step>) -> Result<Self> {
        let Some(Step::Return(ret)) = steps.last() else {
            return Err(Error::new_simple("block has no return statement").with_code(codes::TYPE));
        };
        Ok(Evaluator {
            kind: ret.kind,
            node: Node::Block(steps),
        })
    }

    pub fn map(properties: Vec<(String, Evaluator)>) -> Result<Self> {
        let mut meta = MapMeta::default();
        let mut evaluators = Vec::with_capacity(properties.len());
        for (key, evaluator) in properties {
            if meta.properties.iter().any(|p| p.key == key) {
                return Err(Error::new_simple(format!("duplicate key {key:?} in object"))
                    .with_code(codes::SEMANTIC));
            }
            meta.properties.push(PropertyMeta {
                key,
                kind: evaluator.kind,
            });
            evaluators.push(evaluator);
        }
        Ok(Evaluator {
            kind: Type::Map,
            node: Node::Map {
                meta,
                properties: evaluators,
            },
        })
    }

    pub fn unary(operator: Operator, argument: Evaluator) -> Result<Self> {
        let kind = argument.kind;
        let node = match (operator, kind) {
            (Operator::Not, Type::Bool) => Node::Not(Box::new(argument)),
            (Operator::Subtraction, Type::Int | Type::Float) => Node::Negate(Box::new(argument)),
            (_, kind) => {
                return Err(Error::new_simple(format!(
                    "invalid unary operator {operator} on type {kind}"
                ))
                .with_code(codes::TYPE))
            }
        };
        Ok(Evaluator { kind, node })
    }

    pub fn logical(operator: Operator, left: Evaluator, right: Evaluator) -> Result<Self> {
        for (side, operand) in [("left", &left), ("right", &right)] {
            if operand.kind != Type::Bool {
                return Err(Error::new_simple(format!(
                    "invalid {side} operand type {} in logical expression",
                    operand.kind
                ))
                .with_code(codes::TYPE));
            }
        }
        Ok(Evaluator {
            kind: Type::Bool,
            node: Node::Logical {
                and: operator == Operator::And,
                left: Box::new(left),
                right: Box::new(right),
            },
        })
    }

    pub fn conditional(test: Evaluator, consequent: Evaluator, alternate: Evaluator) -> Result<Self> {
        if test.kind != Type::Bool {
            return Err(Error::new_simple(format!(
                "conditional test must be of type bool, but got {}",
                test.kind
            ))
            .with_code(codes::TYPE));
        }
        if consequent.kind != alternate.kind {
            return Err(Error::new_simple(format!(
                "conditional branches must have the same type, got {} and {}",
                consequent.kind, alternate.kind
            ))
            .with_code(codes::TYPE));
        }
        Ok(Evaluator {
            kind: consequent.kind,
            node: Node::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        })
    }

    pub fn binary(operator: Operator, left: Evaluator, right: Evaluator) -> Result<Self> {
        let Some((function, kind)) = binary_signature(operator, left.kind, right.kind) else {
            return Err(Error::new_simple(format!(
                "unsupported binary expression with types {} {operator} {}",
                left.kind, right.kind
            ))
            .with_code(codes::TYPE));
        };
        Ok(Evaluator {
            kind,
            node: Node::Binary {
                function,
                left: Box::new(left),
                right: Box::new(right),
            },
        })
    }

    /// The keys of the map this evaluator produces, when it is a literal
    /// object or a block returning one.
    pub fn map_meta(&self) -> Option<&MapMeta> {
        match &self.node {
            Node::Map { meta, .. } => Some(meta),
            Node::Block(steps) => match steps.last()? {
                Step::Return(ret) => ret.map_meta(),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn eval(&self, scope: &Scope) -> Result<Value> {
        match &self.node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Reference(path) => scope.get(path).cloned().ok_or_else(|| {
                Error::new_assert(format!("no value in scope for reference {path:?}"))
            }),
            Node::Block(steps) => eval_block(steps, scope),
            Node::Map { meta, properties } => {
                let mut map = Map::default();
                for (prop, evaluator) in meta.properties.iter().zip(properties) {
                    map.properties.push((prop.key.clone(), evaluator.eval(scope)?));
                }
                Ok(Value::Map(map))
            }
            Node::Not(argument) => Ok(Value::Bool(!argument.eval_bool(scope)?)),
            Node::Negate(argument) => match argument.eval(scope)? {
                Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(type_error(other.kind(), self.kind)),
            },
            Node::Logical { and, left, right } => {
                let left = left.eval_bool(scope)?;
                if left != *and {
                    return Ok(Value::Bool(left));
                }
                right.eval(scope)
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if test.eval_bool(scope)? {
                    consequent.eval(scope)
                } else {
                    alternate.eval(scope)
                }
            }
            Node::Binary {
                function,
                left,
                right,
            } => apply(*function, left.eval(scope)?, right.eval(scope)?),
        }
    }

    fn eval_bool(&self, scope: &Scope) -> Result<bool> {
        match self.eval(scope)? {
            Value::Bool(b) => Ok(b),
            other => Err(type_error(other.kind(), Type::Bool)),
        }
    }
}

fn eval_block(steps: &[Step], scope: &Scope) -> Result<Value> {
    // declarations shadow the row, so they go to a copy of it
    let mut scope = Cow::Borrowed(scope);
    for step in steps {
        match step {
            Step::Declare(path, init) => {
                let value = init.eval(&scope)?;
                scope.to_mut().set(path.clone(), value);
            }
            Step::Expression(expr) => {
                expr.eval(&scope)?;
            }
            Step::Return(expr) => return expr.eval(&scope),
        }
    }
    Err(Error::new_assert("block ended without a return"))
}

/// An internal error: a value of the wrong kind reached an evaluator.
pub(super) fn type_error(actual: Type, expected: Type) -> Error {
    Error::new_assert(format!("unexpected type: got {actual} want {expected}"))
}

/// The function and result kind of `left <operator> right`, if the operator
/// applies to these kinds.
fn binary_signature(operator: Operator, left: Type, right: Type) -> Option<(BinaryFn, Type)> {
    use Operator::*;

    let numeric = |t: Type| matches!(t, Type::Int | Type::UInt | Type::Float);

    match operator {
        Addition | Subtraction | Multiplication | Division if left == right && numeric(left) => {
            Some((BinaryFn::Arithmetic(operator), left))
        }
        Addition if left == Type::String && right == Type::String => {
            Some((BinaryFn::Concat, Type::String))
        }
        LessThan | LessThanEqual | GreaterThan | GreaterThanEqual | Equal | NotEqual
            if numeric(left) && numeric(right) =>
        {
            Some((BinaryFn::Compare(operator), Type::Bool))
        }
        LessThan | LessThanEqual | GreaterThan | GreaterThanEqual | Equal | NotEqual
            if left == right && matches!(left, Type::String | Type::Time) =>
        {
            Some((BinaryFn::Compare(operator), Type::Bool))
        }
        Equal | NotEqual if left == Type::Bool && right == Type::Bool => {
            Some((BinaryFn::Compare(operator), Type::Bool))
        }
        StartsWith if left == Type::String && right == Type::String => {
            Some((BinaryFn::StartsWith, Type::Bool))
        }
        _ => None,
    }
}

fn apply(function: BinaryFn, left: Value, right: Value) -> Result<Value> {
    let mismatch = |left: &Value, right: &Value| {
        Error::new_assert(format!(
            "unexpected operand types {} and {} for {function:?}",
            left.kind(),
            right.kind()
        ))
    };

    match function {
        BinaryFn::Arithmetic(operator) => arithmetic(operator, &left, &right)
            .unwrap_or_else(|| Err(mismatch(&left, &right))),
        BinaryFn::Compare(operator) => compare(operator, &left, &right)
            .map(Value::Bool)
            .ok_or_else(|| mismatch(&left, &right)),
        BinaryFn::Concat => match (left, right) {
            (Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
            (l, r) => Err(mismatch(&l, &r)),
        },
        BinaryFn::StartsWith => match (&left, &right) {
            (Value::String(l), Value::String(r)) => Ok(Value::Bool(l.starts_with(r.as_str()))),
            _ => Err(mismatch(&left, &right)),
        },
    }
}

fn arithmetic(operator: Operator, left: &Value, right: &Value) -> Option<Result<Value>> {
    use Operator::*;

    let division_by_zero = || {
        Error::new_simple("integer division by zero").with_code(codes::TYPE)
    };

    Some(match (left, right) {
        (Value::Int(l), Value::Int(r)) => match operator {
            Addition => Ok(Value::Int(l.wrapping_add(*r))),
            Subtraction => Ok(Value::Int(l.wrapping_sub(*r))),
            Multiplication => Ok(Value::Int(l.wrapping_mul(*r))),
            Division if *r == 0 => Err(division_by_zero()),
            Division => Ok(Value::Int(l.wrapping_div(*r))),
            _ => return None,
        },
        (Value::UInt(l), Value::UInt(r)) => match operator {
            Addition => Ok(Value::UInt(l.wrapping_add(*r))),
            Subtraction => Ok(Value::UInt(l.wrapping_sub(*r))),
            Multiplication => Ok(Value::UInt(l.wrapping_mul(*r))),
            Division => l.checked_div(*r).map(Value::UInt).ok_or_else(division_by_zero),
            _ => return None,
        },
        (Value::Float(l), Value::Float(r)) => match operator {
            Addition => Ok(Value::Float(l + r)),
            Subtraction => Ok(Value::Float(l - r)),
            Multiplication => Ok(Value::Float(l * r)),
            Division => Ok(Value::Float(l / r)),
            _ => return None,
        },
        _ => return None,
    })
}

fn compare(operator: Operator, left: &Value, right: &Value) -> Option<bool> {
    let ordering = match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Time(l), Value::Time(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => {
            return match operator {
                Operator::Equal => Some(l == r),
                Operator::NotEqual => Some(l != r),
                _ => None,
            }
        }
        (l, r) => as_number(l)?.partial_cmp(&as_number(r)?),
    };

    Some(match operator {
        Operator::Equal => ordering == Some(Ordering::Equal),
        Operator::NotEqual => ordering != Some(Ordering::Equal),
        Operator::LessThan => ordering == Some(Ordering::Less),
        Operator::LessThanEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::GreaterThan => ordering == Some(Ordering::Greater),
        Operator::GreaterThanEqual => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        _ => return None,
    })
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::UInt(u) => Some(Number::UInt(*u)),
        Value::Float(f) => Some(Number::Float(*f)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Operator::Addition, Type::Int, Type::Int, Some(Type::Int))]
    #[case(Operator::Addition, Type::Int, Type::Float, None)]
    #[case(Operator::Division, Type::UInt, Type::UInt, Some(Type::UInt))]
    #[case(Operator::Addition, Type::String, Type::String, Some(Type::String))]
    #[case(Operator::Subtraction, Type::String, Type::String, None)]
    #[case(Operator::LessThan, Type::Int, Type::UInt, Some(Type::Bool))]
    #[case(Operator::Equal, Type::Float, Type::Int, Some(Type::Bool))]
    #[case(Operator::Equal, Type::Bool, Type::Bool, Some(Type::Bool))]
    #[case(Operator::LessThan, Type::Bool, Type::Bool, None)]
    #[case(Operator::GreaterThan, Type::Time, Type::Time, Some(Type::Bool))]
    #[case(Operator::Equal, Type::String, Type::Int, None)]
    #[case(Operator::StartsWith, Type::String, Type::String, Some(Type::Bool))]
    #[case(Operator::In, Type::String, Type::String, None)]
    fn test_signatures(
        #[case] operator: Operator,
        #[case] left: Type,
        #[case] right: Type,
        #[case] expected: Option<Type>,
    ) {
        assert_eq!(
            binary_signature(operator, left, right).map(|(_, kind)| kind),
            expected
        );
    }

    #[test]
    fn test_sign_aware_comparison() {
        let scope = Scope::new();
        let lt = Evaluator::binary(
            Operator::LessThan,
            Evaluator::literal(Value::Int(-1)),
            Evaluator::literal(Value::UInt(u64::MAX)),
        )
        .unwrap();
        assert_eq!(lt.eval(&scope).unwrap(), Value::Bool(true));

        let eq = Evaluator::binary(
            Operator::Equal,
            Evaluator::literal(Value::Int(-1)),
            Evaluator::literal(Value::UInt(u64::MAX)),
        )
        .unwrap();
        assert_eq!(eq.eval(&scope).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_division_by_zero() {
        let div = Evaluator::binary(
            Operator::Division,
            Evaluator::literal(Value::Int(1)),
            Evaluator::literal(Value::Int(0)),
        )
        .unwrap();
        let error = div.eval(&Scope::new()).unwrap_err();
        assert_eq!(error.to_string(), "integer division by zero");
    }

    #[test]
    fn test_logical_short_circuit() {
        // the right side would fail with an internal error if evaluated
        let missing = Evaluator::reference("r.missing".to_string(), Type::Bool);
        let or = Evaluator::logical(
            Operator::Or,
            Evaluator::literal(Value::Bool(true)),
            missing,
        )
        .unwrap();
        assert_eq!(or.eval(&Scope::new()).unwrap(), Value::Bool(true));
    }
}
