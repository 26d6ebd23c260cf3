//! Lowering of the AST into the semantic graph.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ifqlc_parser::ast;
use itertools::Itertools;

use super::graph::*;
use crate::time::Duration;
use crate::{Error, Reason, Result, Span, WithErrorInfo};

/// Converts a parsed program into a semantic program.
///
/// Fails on the first invalid construct: a parameter default that isn't a
/// literal, a parameter declared twice, a malformed literal or a regular
/// expression that doesn't compile.
pub(super) fn analyze_program(program: ast::Program) -> Result<Program> {
    let package = program.package.map(|p| PackageClause {
        name: p.name,
        version: p.version,
    });

    let imports = program
        .imports
        .into_iter()
        .map(|i| ImportDeclaration {
            path: i.path,
            version: i.version,
            alias: i.alias,
            span: i.span,
        })
        .collect();

    let body = program.body.into_iter().map(analyze_stmt).try_collect()?;

    let program = Program {
        package,
        imports,
        body,
    };
    log::debug!("semantic program built with {} statements", program.body.len());
    Ok(program)
}

fn analyze_stmt(stmt: ast::Stmt) -> Result<Statement> {
    let kind = match stmt.kind {
        ast::StmtKind::VarDef(var_def) => StatementKind::Variable(VariableDeclaration {
            name: var_def.name,
            init: analyze_expr(*var_def.value)?,
        }),
        ast::StmtKind::Expr(expr) => StatementKind::Expression(analyze_expr(*expr)?),
        ast::StmtKind::Return(expr) => StatementKind::Return(analyze_expr(*expr)?),
    };
    Ok(Statement {
        kind,
        span: stmt.span,
    })
}

fn analyze_expr(expr: ast::Expr) -> Result<Expression> {
    let span = expr.span;
    let kind = match expr.kind {
        ast::ExprKind::Ident(name) => ExpressionKind::Identifier(name),
        ast::ExprKind::Literal(ast::Literal::Field) => ExpressionKind::Field,
        ast::ExprKind::Literal(lit) => ExpressionKind::Literal(analyze_literal(lit, span)?),

        ast::ExprKind::Call(call) => ExpressionKind::Call(CallExpression {
            callee: Box::new(analyze_expr(*call.callee)?),
            arguments: analyze_properties(call.arguments)?,
        }),
        ast::ExprKind::Member(member) => ExpressionKind::Member(MemberExpression {
            object: Box::new(analyze_expr(*member.object)?),
            property: member.property,
        }),
        ast::ExprKind::Object(properties) => {
            ExpressionKind::Object(analyze_properties(properties)?)
        }
        ast::ExprKind::Array(items) => {
            ExpressionKind::Array(items.into_iter().map(analyze_expr).try_collect()?)
        }
        ast::ExprKind::ArrowFunction(func) => ExpressionKind::from(analyze_function(*func)?),

        ast::ExprKind::Binary(binary) => ExpressionKind::Binary(BinaryExpression {
            operator: binary_operator(binary.op),
            left: Box::new(analyze_expr(*binary.left)?),
            right: Box::new(analyze_expr(*binary.right)?),
        }),
        ast::ExprKind::Logical(logical) => ExpressionKind::Logical(LogicalExpression {
            operator: match logical.op {
                ast::LogicalOp::And => Operator::And,
                ast::LogicalOp::Or => Operator::Or,
            },
            left: Box::new(analyze_expr(*logical.left)?),
            right: Box::new(analyze_expr(*logical.right)?),
        }),
        ast::ExprKind::Unary(unary) => {
            let argument = analyze_expr(*unary.expr)?;
            let operator = match unary.op {
                ast::UnOp::Not => Operator::Not,
                ast::UnOp::Neg => Operator::Subtraction,
                ast::UnOp::Empty => Operator::Empty,
                ast::UnOp::NotEmpty => Operator::NotEmpty,
            };

            match negate_literal(operator, &argument) {
                Some(lit) => ExpressionKind::Literal(lit),
                None => ExpressionKind::Unary(UnaryExpression {
                    operator,
                    argument: Box::new(argument),
                }),
            }
        }
        ast::ExprKind::Conditional(c) => ExpressionKind::Conditional(ConditionalExpression {
            test: Box::new(analyze_expr(*c.test)?),
            consequent: Box::new(analyze_expr(*c.consequent)?),
            alternate: Box::new(analyze_expr(*c.alternate)?),
        }),
    };
    Ok(Expression { kind, span })
}

fn analyze_properties(properties: Vec<ast::Property>) -> Result<ObjectExpression> {
    let properties = properties
        .into_iter()
        .map(|p| -> Result<_> {
            Ok(Property {
                key: p.key,
                value: analyze_expr(p.value)?,
                span: p.span,
            })
        })
        .try_collect()?;
    Ok(ObjectExpression { properties })
}

fn analyze_function(func: ast::ArrowFunction) -> Result<FunctionExpression> {
    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(func.params.len());

    for param in func.params {
        if !seen.insert(param.name.clone()) {
            return Err(Error::new_simple(format!(
                "function parameter {:?} is declared twice",
                param.name
            ))
            .with_span(param.span));
        }

        let default = match param.default {
            None => None,
            Some(default) => {
                let expr = analyze_expr(*default)?;
                match expr.kind {
                    ExpressionKind::Literal(lit) => Some(lit),
                    _ => {
                        return Err(Error::new_simple(format!(
                            "function parameter {:?} default value is not a literal",
                            param.name
                        ))
                        .with_span(expr.span.or(param.span)))
                    }
                }
            }
        };

        params.push(FunctionParam {
            key: param.name,
            default,
            span: param.span,
        });
    }

    let body = match func.body {
        ast::ArrowBody::Expr(expr) => FunctionBody::Expression(Box::new(analyze_expr(*expr)?)),
        ast::ArrowBody::Block(stmts) => {
            FunctionBody::Block(stmts.into_iter().map(analyze_stmt).try_collect()?)
        }
    };

    Ok(FunctionExpression { params, body })
}

fn analyze_literal(lit: ast::Literal, span: Option<Span>) -> Result<Literal> {
    Ok(match lit {
        ast::Literal::String(s) => Literal::String(s),
        ast::Literal::Integer(i) => Literal::Integer(i),
        ast::Literal::UnsignedInteger(u) => Literal::UnsignedInteger(u),
        ast::Literal::Float(f) => Literal::Float(f),
        ast::Literal::Boolean(b) => Literal::Boolean(b),
        ast::Literal::Duration(segments) => {
            let duration = Duration::from_segments(&segments).ok_or_else(|| {
                Error::new_simple("duration literal is out of range").with_span(span)
            })?;
            Literal::Duration(duration)
        }
        ast::Literal::DateTime(text) => {
            let time = DateTime::parse_from_rfc3339(&text).map_err(|e| {
                Error::new_simple(format!("invalid date time {text:?}: {e}")).with_span(span)
            })?;
            Literal::DateTime(time.with_timezone(&Utc))
        }
        ast::Literal::Regexp(pattern) => {
            if let Err(e) = regex::Regex::new(&pattern) {
                return Err(Error::new(Reason::Simple(format!(
                    "invalid regular expression /{pattern}/: {e}"
                )))
                .with_span(span));
            }
            Literal::Regexp(pattern)
        }
        ast::Literal::Field => {
            return Err(Error::new_assert("`$` is not a literal value").with_span(span))
        }
    })
}

/// `-4h` is a negative duration literal rather than a negation, which keeps
/// negative numbers usable as parameter defaults.
fn negate_literal(operator: Operator, argument: &Expression) -> Option<Literal> {
    if operator != Operator::Subtraction {
        return None;
    }
    match argument.kind.as_literal()? {
        Literal::Integer(i) => i.checked_neg().map(Literal::Integer),
        Literal::UnsignedInteger(u) if *u == i64::MIN.unsigned_abs() => {
            Some(Literal::Integer(i64::MIN))
        }
        Literal::Float(f) => Some(Literal::Float(-f)),
        Literal::Duration(d) => d.checked_neg().map(Literal::Duration),
        _ => None,
    }
}

fn binary_operator(op: ast::BinOp) -> Operator {
    match op {
        ast::BinOp::Mul => Operator::Multiplication,
        ast::BinOp::Div => Operator::Division,
        ast::BinOp::Add => Operator::Addition,
        ast::BinOp::Sub => Operator::Subtraction,
        ast::BinOp::Lte => Operator::LessThanEqual,
        ast::BinOp::Lt => Operator::LessThan,
        ast::BinOp::Gte => Operator::GreaterThanEqual,
        ast::BinOp::Gt => Operator::GreaterThan,
        ast::BinOp::StartsWith => Operator::StartsWith,
        ast::BinOp::In => Operator::In,
        ast::BinOp::Eq => Operator::Equal,
        ast::BinOp::Ne => Operator::NotEqual,
        ast::BinOp::RegexMatch => Operator::RegexpMatch,
        ast::BinOp::RegexNotMatch => Operator::RegexpNotMatch,
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn analyze_source(source: &str) -> Result<Program> {
        let ast = ifqlc_parser::parse_source(source, 0)
            .map_err(|errors| errors.into_iter().next().unwrap())?;
        analyze_program(ast)
    }

    fn shown(source: &str) -> String {
        let program = analyze_source(source).unwrap();
        match &program.body[0].kind {
            StatementKind::Expression(expr) => expr.to_string(),
            StatementKind::Variable(var) => var.init.to_string(),
            StatementKind::Return(expr) => expr.to_string(),
        }
    }

    #[test]
    fn test_operators() {
        assert_snapshot!(shown("a + 1 * 2 > b and not c"), @"(((a + (1 * 2)) > b) and (not c))");
        assert_snapshot!(shown(r#"r.host =~ /^web/ or empty r.x"#), @r#"((r.host =~ /^web/) or (empty r.x))"#);
        assert_snapshot!(shown("a ? b : c"), @"(a ? b : c)");
    }

    #[test]
    fn test_negative_literals() {
        assert_eq!(shown("-4h"), "-4h");
        assert_eq!(shown("-1"), "-1");
        assert_eq!(shown("-1.5"), "-1.5");
        assert_eq!(shown("-9223372036854775808"), "-9223372036854775808");
        // negation of anything else stays an operation
        assert_eq!(shown("-a"), "(- a)");

        let program = analyze_source("f = (n=-1) => n").unwrap();
        let var = program.body[0].kind.as_variable().unwrap();
        let func = var.init.kind.as_function().unwrap();
        assert_eq!(func.params[0].default, Some(Literal::Integer(-1)));
    }

    #[test]
    fn test_literals() {
        let program = analyze_source("t = 2017-01-01T02:00:00+02:00").unwrap();
        let init = &program.body[0].kind.as_variable().unwrap().init;
        assert_eq!(init.to_string(), "2017-01-01T00:00:00Z");
        assert_eq!(init.value_kind(), Kind::Time);

        assert_eq!(shown("1w"), "168h");
        assert_eq!(shown(r#"{a: 1, b: "x"}"#), r#"{a: 1, b: "x"}"#);
        assert_eq!(shown("[1u, 2.0]"), "[1u, 2.0]");
    }

    #[test]
    fn test_predicate_field() {
        assert_eq!(
            shown(r#"{"t1" == "val1" and $ > 10}"#),
            r#"() => (("t1" == "val1") and ($ > 10))"#
        );
    }

    #[test]
    fn test_default_not_literal() {
        let err = analyze_source("f = (n=x) => n").unwrap_err();
        assert_snapshot!(err, @r#"function parameter "n" default value is not a literal"#);
        assert_eq!(err.span, Some(Span::new(0, 7..8)));
    }

    #[test]
    fn test_duplicate_param() {
        let err = analyze_source("f = (a, a) => a").unwrap_err();
        assert_snapshot!(err, @r#"function parameter "a" is declared twice"#);
    }

    #[test]
    fn test_invalid_regex() {
        let err = analyze_source("r =~ /a{2,1}/").unwrap_err();
        assert!(err.to_string().starts_with("invalid regular expression /a{2,1}/"));
    }

    #[test]
    fn test_package_and_imports() {
        let program = analyze_source("package stats 1.0.0\nimport \"math\" as m\nx = 1").unwrap();
        let package = program.package.unwrap();
        assert_eq!(package.name, "stats");
        assert_eq!(package.version, Some(semver::Version::new(1, 0, 0)));
        assert_eq!(program.imports[0].alias.as_deref(), Some("m"));
        assert!(program.imports[0].span.is_some());
    }
}
