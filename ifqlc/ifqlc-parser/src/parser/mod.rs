use chumsky::Stream;

use crate::lexer::lr::{Token, TokenKind};
use crate::span::Span;

pub(crate) mod common;
pub(crate) mod expr;
pub(crate) mod perror;
pub(crate) mod stmt;

/// Turn lexed tokens into a stream of tokens with spans that carry the
/// source id.
pub(crate) fn prepare_stream<'a>(
    tokens: impl Iterator<Item = Token> + 'a,
    source: &str,
    source_id: u16,
) -> Stream<'a, TokenKind, Span, impl Iterator<Item = (TokenKind, Span)> + 'a> {
    let tokens = tokens.map(move |token| (token.kind, Span::new(source_id, token.span)));

    let len = source.chars().count();
    let eoi = Span::new(source_id, len..len + 1);

    Stream::from_iter(eoi, tokens)
}
