//! Detaching functions from the scope they were defined in.

use std::collections::HashSet;

use ifqlc_parser::error::codes;
use itertools::Itertools;

use super::{Function, ScopeId, Scopes, Value};
use crate::semantic::fold::{self, SemanticFold};
use crate::semantic::*;
use crate::{Error, Result, Span, WithErrorInfo};

/// Rewrites a function so that it doesn't depend on its scope: every free
/// identifier is replaced with the value it is bound to.
pub fn resolve_function(function: &Function, scopes: &Scopes) -> Result<FunctionExpression> {
    match function {
        Function::Arrow(arrow) | Function::Resolve(arrow) => {
            let mut resolver = Resolver {
                scopes,
                scope: arrow.scope,
                bound: Vec::new(),
            };
            resolver.fold_function(arrow.expr.clone())
        }
        Function::Builtin { entry, .. } => Err(cannot_resolve_function(entry.name)),
    }
}

/// The expression that evaluates to `value`.
pub fn value_to_expression(value: &Value, scopes: &Scopes) -> Result<ExpressionKind> {
    Ok(match value {
        Value::String(s) => Literal::String(s.clone()).into(),
        Value::Int(i) => Literal::Integer(*i).into(),
        Value::UInt(u) => Literal::UnsignedInteger(*u).into(),
        Value::Float(f) if !f.is_finite() => {
            return Err(Error::new_simple(format!(
                "non-finite float {f} cannot be used in a query"
            ))
            .with_code(codes::TYPE));
        }
        Value::Float(f) => Literal::Float(*f).into(),
        Value::Bool(b) => Literal::Boolean(*b).into(),
        Value::Time(t) => Literal::DateTime(*t).into(),
        Value::Duration(d) => Literal::Duration(*d).into(),
        Value::Regex(r) => Literal::Regexp(r.as_str().to_string()).into(),

        Value::Array(array) => ExpressionKind::Array(
            array
                .elements
                .iter()
                .map(|v| value_to_expression(v, scopes).map(Expression::new))
                .try_collect()?,
        ),
        Value::Map(map) => ExpressionKind::Object(ObjectExpression {
            properties: map
                .iter()
                .map(|(key, v)| -> Result<_> {
                    Ok(Property {
                        key: key.clone(),
                        value: Expression::new(value_to_expression(v, scopes)?),
                        span: None,
                    })
                })
                .try_collect()?,
        }),

        Value::Function(Function::Arrow(arrow)) => {
            resolve_function(&Function::Arrow(arrow.clone()), scopes)?.into()
        }
        Value::Function(Function::Builtin { entry, .. }) => {
            return Err(cannot_resolve_function(entry.name))
        }
        Value::Function(Function::Resolve(_)) => return Err(cannot_resolve_function("resolve")),

        Value::Table(_) => {
            return Err(
                Error::new_simple("cannot resolve value of type table").with_code(codes::TYPE)
            )
        }
    })
}

fn cannot_resolve_function(name: &str) -> Error {
    Error::new_simple(format!("function {name:?} cannot be resolved")).with_code(codes::TYPE)
}

struct Resolver<'a> {
    scopes: &'a Scopes,
    scope: ScopeId,
    /// Names bound by each enclosing function: its parameters and the
    /// variables of its block.
    bound: Vec<HashSet<String>>,
}

impl<'a> Resolver<'a> {
    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|names| names.contains(name))
    }

    fn lookup(&self, name: &str) -> Result<&'a Value> {
        let scopes: &'a Scopes = self.scopes;
        scopes.lookup(self.scope, name).ok_or_else(|| {
            Error::new_simple(format!("name {name:?} does not exist in scope"))
                .with_code(codes::NAME)
        })
    }

    /// `pkg.name` on a free map resolves to the entry alone.
    fn resolve_member(
        &self,
        member: &MemberExpression,
        span: Option<Span>,
    ) -> Result<Option<ExpressionKind>> {
        let ExpressionKind::Identifier(name) = &member.object.kind else {
            return Ok(None);
        };
        if self.is_bound(name) {
            return Ok(None);
        }
        let Value::Map(map) = self.lookup(name).with_span_fallback(span)? else {
            return Ok(None);
        };

        let value = map.get(&member.property).ok_or_else(|| {
            Error::new_simple(format!("property {:?} not found", member.property))
                .with_code(codes::NAME)
                .with_span(span)
        })?;
        value_to_expression(value, self.scopes).map(Some)
    }
}

impl SemanticFold for Resolver<'_> {
    fn fold_expression(&mut self, expr: Expression) -> Result<Expression> {
        let span = expr.span;
        let kind = match expr.kind {
            ExpressionKind::Identifier(name) if !self.is_bound(&name) => {
                let scopes = self.scopes;
                self.lookup(&name)
                    .and_then(|value| value_to_expression(value, scopes))
                    .with_span_fallback(span)?
            }

            ExpressionKind::Member(member) => match self.resolve_member(&member, span)? {
                Some(kind) => kind,
                None => fold::fold_expression_kind(self, ExpressionKind::Member(member))?,
            },

            kind => self.fold_expression_kind(kind)?,
        };
        Ok(Expression { kind, span })
    }

    fn fold_function(&mut self, function: FunctionExpression) -> Result<FunctionExpression> {
        let mut names: HashSet<String> = function.params.iter().map(|p| p.key.clone()).collect();
        if let FunctionBody::Block(statements) = &function.body {
            names.extend(
                statements
                    .iter()
                    .filter_map(|s| s.kind.as_variable())
                    .map(|var| var.name.clone()),
            );
        }

        self.bound.push(names);
        let function = fold::fold_function(self, function);
        self.bound.pop();
        function
    }
}
