use chumsky::prelude::*;
use semver::{Version, VersionReq};

use super::common::{ctrl, ident_part, into_stmt, keyword, new_line, string};
use super::expr::expr;
use super::perror::PError;
use crate::ast::*;
use crate::lexer::lr::TokenKind;

#[derive(Clone)]
enum Item {
    Package(PackageClause),
    Import(ImportDef),
    Stmt(Stmt),
}

pub(crate) fn source() -> impl Parser<TokenKind, Program, Error = PError> {
    let item = choice((
        package_clause().map(Item::Package),
        import_def().map(Item::Import),
        stmt(expr()).map(Item::Stmt),
    ));

    item.separated_by(new_line().repeated().at_least(1))
        .allow_leading()
        .allow_trailing()
        .then_ignore(end())
        .validate(|items, span, emit| {
            let mut program = Program::default();

            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Item::Package(package) => {
                        if index > 0 {
                            emit(PError::custom(
                                package.span.unwrap_or(span),
                                "package clause must be the first statement",
                            ));
                        }
                        program.package = Some(package);
                    }
                    Item::Import(import) => {
                        if !program.body.is_empty() {
                            emit(PError::custom(
                                import.span.unwrap_or(span),
                                "imports must precede other statements",
                            ));
                        }
                        program.imports.push(import);
                    }
                    Item::Stmt(stmt) => program.body.push(stmt),
                }
            }

            program
        })
}

/// Statements in `{ ... }`, the body of an arrow function.
pub(crate) fn block<E>(expr: E) -> impl Parser<TokenKind, Vec<Stmt>, Error = PError> + Clone
where
    E: Parser<TokenKind, Expr, Error = PError> + Clone,
{
    stmt(expr)
        .separated_by(new_line().repeated().at_least(1))
        .allow_leading()
        .allow_trailing()
        .delimited_by(ctrl('{'), ctrl('}'))
        .labelled("block")
}

fn stmt<E>(expr: E) -> impl Parser<TokenKind, Stmt, Error = PError> + Clone
where
    E: Parser<TokenKind, Expr, Error = PError> + Clone,
{
    let var_def = keyword("var")
        .or_not()
        .ignore_then(ident_part())
        .then_ignore(ctrl('='))
        .then_ignore(new_line().repeated())
        .then(expr.clone())
        .map(|(name, value)| {
            StmtKind::VarDef(VarDef {
                name,
                value: Box::new(value),
            })
        })
        .labelled("variable definition");

    let return_ = keyword("return")
        .ignore_then(expr.clone())
        .map(|value| StmtKind::Return(Box::new(value)))
        .labelled("return statement");

    let expr_stmt = expr.map(|value| StmtKind::Expr(Box::new(value)));

    choice((return_, var_def, expr_stmt)).map_with_span(into_stmt)
}

fn package_clause() -> impl Parser<TokenKind, PackageClause, Error = PError> + Clone {
    let version = select! { TokenKind::Version(v) => v }
        .validate(|v, span, emit| match Version::parse(&v) {
            Ok(version) => Some(version),
            Err(e) => {
                emit(PError::custom(span, format!("invalid version {v:?}: {e}")));
                None
            }
        })
        .labelled("version");

    keyword("package")
        .ignore_then(ident_part())
        .then(version.or_not().map(Option::flatten))
        .map_with_span(|(name, version), span| PackageClause {
            name,
            version,
            span: Some(span),
        })
        .labelled("package clause")
}

fn import_def() -> impl Parser<TokenKind, ImportDef, Error = PError> + Clone {
    let version = select! {
        TokenKind::Version(v) => v,
        TokenKind::Literal(Literal::String(v)) => v,
    }
    .validate(|v, span, emit| match VersionReq::parse(&v) {
        Ok(version) => Some(version),
        Err(e) => {
            emit(PError::custom(span, format!("invalid version {v:?}: {e}")));
            None
        }
    })
    .labelled("version");

    keyword("import")
        .ignore_then(string())
        .then(version.or_not().map(Option::flatten))
        .then(keyword("as").ignore_then(ident_part()).or_not())
        .map_with_span(|((path, version), alias), span| ImportDef {
            path,
            version,
            alias,
            span: Some(span),
        })
        .labelled("import statement")
}
