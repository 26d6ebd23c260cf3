use chumsky::error::{Simple, SimpleReason};

use crate::error::{codes, Error, ErrorSource, Reason, WithErrorInfo};
use crate::lexer::lr::TokenKind;
use crate::span::Span;

pub type PError = Simple<TokenKind, Span>;

pub(crate) fn convert_parser_error(e: PError) -> Error {
    let mut span = e.span();

    if e.found().is_none() {
        // found end of file
        // fix for span outside of source
        if span.start > 0 && span.end > 0 {
            span.start -= 1;
            span.end -= 1;
        }
    }

    construct_parser_error(e)
        .with_span(Some(span))
        .with_code(codes::SYNTAX)
        .with_source(ErrorSource::Parser)
}

fn construct_parser_error(e: PError) -> Error {
    if let SimpleReason::Custom(message) = e.reason() {
        return Error::new_simple(message);
    }

    fn token_to_string(t: Option<&TokenKind>) -> String {
        t.map(|t| DisplayToken(t).to_string())
            .unwrap_or_else(|| "end of input".to_string())
    }

    let is_all_whitespace = e
        .expected()
        .all(|t| matches!(t, None | Some(TokenKind::NewLine)));
    let mut expected: Vec<String> = e
        .expected()
        // Only include whitespace if we're _only_ expecting whitespace
        .filter(|t| is_all_whitespace || !matches!(t, None | Some(TokenKind::NewLine)))
        .map(|t| token_to_string(t.as_ref()))
        .collect();
    expected.sort();
    expected.dedup();

    let expected = match expected.split_last() {
        Some((last, [])) if expected.len() <= 10 => last.clone(),
        Some((last, [first])) => format!("{first} or {last}"),
        Some((last, init)) if expected.len() <= 10 => {
            format!("one of {} or {last}", init.join(", "))
        }
        _ => {
            let found = token_to_string(e.found());
            let found = match e.label() {
                Some(label) => format!("{found} while parsing {label}"),
                None => found,
            };
            return Error::new(Reason::Unexpected { found });
        }
    };

    match e.found() {
        Some(found) => Error::new(Reason::Expected {
            who: e.label().map(|x| x.to_string()),
            expected,
            found: DisplayToken(found).to_string(),
        }),
        // We want a friendlier message than "found end of input"...
        None => Error::new(Reason::Simple(format!(
            "expected {expected}, but didn't find anything before the end"
        ))),
    }
}

struct DisplayToken<'a>(&'a TokenKind);

impl std::fmt::Display for DisplayToken<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            TokenKind::NewLine => write!(f, "new line"),
            TokenKind::Ident(arg0) => {
                if arg0.is_empty() {
                    write!(f, "an identifier")
                } else {
                    write!(f, "`{arg0}`")
                }
            }
            TokenKind::Keyword(arg0) => write!(f, "keyword {arg0}"),
            TokenKind::Literal(..) => write!(f, "literal"),
            TokenKind::Version(..) => write!(f, "version"),
            TokenKind::Control(arg0) => write!(f, "`{arg0}`"),
            other => write!(f, "`{other}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chumsky::Error as _;
    use insta::assert_snapshot;

    use super::*;

    fn span() -> Span {
        Span::new(0, 3..4)
    }

    #[test]
    fn expected_tokens() {
        let e = PError::expected_input_found(
            span(),
            [
                Some(TokenKind::Control(')')),
                Some(TokenKind::Control(',')),
                Some(TokenKind::NewLine),
            ],
            Some(TokenKind::Ident("x".to_string())),
        );
        let error = convert_parser_error(e);
        assert_snapshot!(error, @"expected `)` or `,`, but found `x`");
        assert_eq!(error.code, Some("E0001"));
        assert_eq!(error.source, ErrorSource::Parser);
    }

    #[test]
    fn end_of_input() {
        let e = PError::expected_input_found(
            Span::new(0, 10..11),
            [Some(TokenKind::Control(')'))],
            None,
        );
        let error = convert_parser_error(e);
        assert_snapshot!(error, @"expected `)`, but didn't find anything before the end");
        assert_eq!(error.span, Some(Span::new(0, 9..10)));
    }

    #[test]
    fn custom_message() {
        let e = PError::custom(span(), "imports must precede other statements");
        assert_snapshot!(convert_parser_error(e), @"imports must precede other statements");
    }
}
