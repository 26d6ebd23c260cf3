//! Compiles row functions into evaluators specialized for the types of the
//! row they are applied to.
//!
//! The interpreter evaluates a query once; row functions like the ones
//! passed to `filter` and `map` run for every row. They are checked against
//! the types of the values they reference ahead of time, so that evaluating
//! them only dispatches on nodes already known to fit together.

mod cache;
mod evaluator;
mod value;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use ifqlc_parser::error::codes;

pub use cache::CompilationCache;
pub use value::{Map, MapMeta, PropertyMeta, ReferencePath, Scope, Type, Value};

use self::evaluator::{type_error, Evaluator, Step};
use crate::semantic::{
    Expression, ExpressionKind, FunctionBody, FunctionExpression, Literal, Statement,
    StatementKind,
};
use crate::{Error, ErrorSource, Result, WithErrorInfo};

/// A row function checked against the types of its references.
#[derive(Debug, Clone)]
pub struct CompiledFn {
    root: Evaluator,
    types: BTreeMap<ReferencePath, Type>,
}

/// Compiles a function of one row. Every reference path of its body must be
/// given a type in `types`.
pub fn compile(
    function: &FunctionExpression,
    types: &HashMap<ReferencePath, Type>,
) -> Result<CompiledFn> {
    compile_function(function, types).with_source(ErrorSource::Compiler)
}

fn compile_function(
    function: &FunctionExpression,
    types: &HashMap<ReferencePath, Type>,
) -> Result<CompiledFn> {
    if function.params.len() != 1 {
        return Err(Error::new_simple(format!(
            "row functions take exactly one parameter, got {}",
            function.params.len()
        ))
        .with_code(codes::ARGUMENT));
    }

    let mut reference_types = BTreeMap::new();
    for path in find_references(function)? {
        let kind = types.get(&path).copied().unwrap_or_default();
        if kind == Type::Invalid {
            return Err(missing_type(&path));
        }
        reference_types.insert(path, kind);
    }

    let mut types = types.clone();
    let root = match &function.body {
        FunctionBody::Expression(expr) => compile_expression(expr, &mut types)?,
        FunctionBody::Block(statements) => compile_block(statements, &mut types)?,
    };
    Ok(CompiledFn {
        root,
        types: reference_types,
    })
}

fn missing_type(path: &str) -> Error {
    Error::new_simple(format!("missing type information for {path:?}")).with_code(codes::TYPE)
}

fn compile_block(
    statements: &[Statement],
    types: &mut HashMap<ReferencePath, Type>,
) -> Result<Evaluator> {
    let last = statements.len().saturating_sub(1);
    let mut steps = Vec::with_capacity(statements.len());
    for (i, statement) in statements.iter().enumerate() {
        let step = match &statement.kind {
            StatementKind::Variable(var) => {
                let init = compile_expression(&var.init, types)?;
                // later statements see the variable with the type of its value
                types.insert(var.name.clone(), init.kind);
                Step::Declare(var.name.clone(), init)
            }
            StatementKind::Expression(expr) => Step::Expression(compile_expression(expr, types)?),
            StatementKind::Return(_) if i != last => {
                return Err(Error::new_simple(
                    "return statement is not the last statement in the block",
                )
                .with_code(codes::SEMANTIC)
                .with_span(statement.span));
            }
            StatementKind::Return(expr) => Step::Return(compile_expression(expr, types)?),
        };
        steps.push(step);
    }
    Evaluator::block(steps)
}

fn compile_expression(
    expr: &Expression,
    types: &mut HashMap<ReferencePath, Type>,
) -> Result<Evaluator> {
    let evaluator = match &expr.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Member(_) => {
            let path = reference_path(expr)?;
            let kind = types.get(&path).copied().unwrap_or_default();
            if kind == Type::Invalid {
                return Err(missing_type(&path).with_span_fallback(expr.span));
            }
            Evaluator::reference(path, kind)
        }
        ExpressionKind::Literal(literal) => Evaluator::literal(literal_value(literal)?),
        ExpressionKind::Object(object) => {
            let mut properties = Vec::with_capacity(object.properties.len());
            for property in &object.properties {
                let value = compile_expression(&property.value, types)?;
                properties.push((property.key.clone(), value));
            }
            Evaluator::map(properties)?
        }
        ExpressionKind::Unary(unary) => {
            let argument = compile_expression(&unary.argument, types)?;
            Evaluator::unary(unary.operator, argument)?
        }
        ExpressionKind::Logical(logical) => {
            let left = compile_expression(&logical.left, types)?;
            let right = compile_expression(&logical.right, types)?;
            Evaluator::logical(logical.operator, left, right)?
        }
        ExpressionKind::Binary(binary) => {
            let left = compile_expression(&binary.left, types)?;
            let right = compile_expression(&binary.right, types)?;
            Evaluator::binary(binary.operator, left, right)?
        }
        ExpressionKind::Conditional(cond) => Evaluator::conditional(
            compile_expression(&cond.test, types)?,
            compile_expression(&cond.consequent, types)?,
            compile_expression(&cond.alternate, types)?,
        )?,
        other => {
            return Err(Error::new_simple(format!(
                "unsupported expression {} in a row function",
                other.as_ref().to_lowercase()
            ))
            .with_code(codes::TYPE)
            .with_span(expr.span))
        }
    };
    Ok(evaluator)
}

fn literal_value(literal: &Literal) -> Result<Value> {
    Ok(match literal {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Integer(i) => Value::Int(*i),
        Literal::UnsignedInteger(u) => Value::UInt(*u),
        Literal::Float(f) => Value::Float(*f),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::DateTime(t) => Value::Time(*t),
        Literal::Duration(_) | Literal::Regexp(_) => {
            let kind = if literal.is_duration() { "duration" } else { "regexp" };
            return Err(Error::new_simple(format!(
                "unsupported {kind} literal in a row function"
            ))
            .with_code(codes::TYPE));
        }
    })
}

/// The dotted path of an identifier or a chain of member accesses on one.
fn reference_path(expr: &Expression) -> Result<ReferencePath> {
    match &expr.kind {
        ExpressionKind::Identifier(name) => Ok(name.clone()),
        ExpressionKind::Member(member) => {
            let object = reference_path(&member.object)?;
            Ok(format!("{object}.{}", member.property))
        }
        other => Err(Error::new_simple(format!(
            "unexpected reference expression of type {}",
            other.as_ref().to_lowercase()
        ))
        .with_code(codes::TYPE)
        .with_span(expr.span)),
    }
}

/// The reference paths a function reads from its row, sorted. Variables
/// declared in the body are not references.
pub fn find_references(function: &FunctionExpression) -> Result<Vec<ReferencePath>> {
    let mut finder = ReferenceFinder::default();
    match &function.body {
        FunctionBody::Expression(expr) => finder.expression(expr)?,
        FunctionBody::Block(statements) => {
            for statement in statements {
                match &statement.kind {
                    StatementKind::Variable(var) => {
                        finder.expression(&var.init)?;
                        finder.declared.insert(var.name.clone());
                    }
                    StatementKind::Expression(expr) | StatementKind::Return(expr) => {
                        finder.expression(expr)?
                    }
                }
            }
        }
    }
    Ok(finder.references.into_iter().collect())
}

#[derive(Default)]
struct ReferenceFinder {
    declared: HashSet<String>,
    references: BTreeSet<ReferencePath>,
}

impl ReferenceFinder {
    fn expression(&mut self, expr: &Expression) -> Result<()> {
        match &expr.kind {
            ExpressionKind::Identifier(name) => {
                if !self.declared.contains(name) {
                    self.references.insert(name.clone());
                }
            }
            ExpressionKind::Member(_) => {
                let path = reference_path(expr)?;
                let root = path.split('.').next().unwrap_or_default();
                if !self.declared.contains(root) {
                    self.references.insert(path);
                }
            }
            ExpressionKind::Object(object) => {
                for property in &object.properties {
                    self.expression(&property.value)?;
                }
            }
            ExpressionKind::Unary(unary) => self.expression(&unary.argument)?,
            ExpressionKind::Logical(logical) => {
                self.expression(&logical.left)?;
                self.expression(&logical.right)?;
            }
            ExpressionKind::Binary(binary) => {
                self.expression(&binary.left)?;
                self.expression(&binary.right)?;
            }
            ExpressionKind::Conditional(cond) => {
                self.expression(&cond.test)?;
                self.expression(&cond.consequent)?;
                self.expression(&cond.alternate)?;
            }
            _ => {}
        }
        Ok(())
    }
}

macro_rules! typed_eval {
    ($($name:ident, $kind:ident, $ty:ty;)*) => {
        $(
            pub fn $name(&self, scope: &Scope) -> Result<$ty> {
                match self.eval(scope)? {
                    Value::$kind(v) => Ok(v),
                    other => Err(type_error(other.kind(), Type::$kind)),
                }
            }
        )*
    };
}

impl CompiledFn {
    /// The type of the values this function returns.
    pub fn kind(&self) -> Type {
        self.root.kind
    }

    pub fn map_meta(&self) -> Option<&MapMeta> {
        self.root.map_meta()
    }

    /// The types of the reference paths this function reads.
    pub fn reference_types(&self) -> &BTreeMap<ReferencePath, Type> {
        &self.types
    }

    pub fn eval(&self, scope: &Scope) -> Result<Value> {
        self.validate(scope)?;
        self.root.eval(scope).with_source(ErrorSource::Compiler)
    }

    typed_eval! {
        eval_bool, Bool, bool;
        eval_int, Int, i64;
        eval_uint, UInt, u64;
        eval_float, Float, f64;
        eval_string, String, String;
        eval_time, Time, chrono::DateTime<chrono::Utc>;
        eval_map, Map, Map;
    }

    fn validate(&self, scope: &Scope) -> Result<()> {
        for (path, kind) in &self.types {
            if scope.kind(path) != *kind {
                return Err(Error::new_simple(format!(
                    "missing or incorrectly typed value found in scope for name {path:?}"
                ))
                .with_code(codes::TYPE)
                .with_source(ErrorSource::Compiler));
            }
        }
        Ok(())
    }
}
