use chumsky::prelude::*;

use super::perror::PError;
use crate::ast::{Literal, Stmt, StmtKind};
use crate::lexer::lr::TokenKind;
use crate::span::Span;

pub(crate) fn ident_part() -> impl Parser<TokenKind, String, Error = PError> + Clone {
    select! {
        TokenKind::Ident(ident) => ident,
    }
    .map_err(|e: PError| {
        PError::expected_input_found(
            e.span(),
            [Some(TokenKind::Ident("".to_string()))],
            e.found().cloned(),
        )
    })
}

pub(crate) fn string() -> impl Parser<TokenKind, String, Error = PError> + Clone {
    select! {
        TokenKind::Literal(Literal::String(s)) => s,
    }
    .labelled("string")
}

pub(crate) fn keyword(kw: &'static str) -> impl Parser<TokenKind, (), Error = PError> + Clone {
    just(TokenKind::Keyword(kw.to_string())).ignored()
}

/// Statements are separated by new lines, so new lines are only allowed in
/// places where they can't end a statement: inside delimiters, before a `.`
/// of a method chain and around binary operators.
pub fn new_line() -> impl Parser<TokenKind, (), Error = PError> + Clone {
    just(TokenKind::NewLine).ignored().labelled("new line")
}

pub(crate) fn ctrl(char: char) -> impl Parser<TokenKind, (), Error = PError> + Clone {
    just(TokenKind::Control(char)).ignored()
}

pub fn into_stmt(kind: StmtKind, span: Span) -> Stmt {
    Stmt {
        kind,
        span: Some(span),
    }
}
