use chumsky::error::{Simple, SimpleReason};
use chumsky::prelude::*;
use chumsky::text::{newline, Character};

use self::lr::{DurationSegment, DurationUnit, Literal, Token, TokenKind, Tokens};
use crate::error::{codes, Error, ErrorSource, Reason, WithErrorInfo};
use crate::span::Span;

pub mod lr;
#[cfg(test)]
mod test;

type LError = Simple<char>;

const KEYWORDS: [&str; 11] = [
    "var",
    "return",
    "import",
    "package",
    "as",
    "and",
    "or",
    "not",
    "in",
    "empty",
    "startswith",
];

/// Lex a source file into tokens, discarding whitespace and comments.
pub fn lex_source(source: &str, source_id: u16) -> Result<Tokens, Vec<Error>> {
    let (tokens, lex_errors) = ::chumsky::Parser::parse_recovery(&lexer(), source);

    log::debug!("lex errors: {lex_errors:?}");
    let errors: Vec<_> = lex_errors
        .into_iter()
        .map(|e| convert_lexer_error(source, e, source_id))
        .collect();

    if errors.is_empty() {
        Ok(Tokens(tokens.unwrap_or_default()))
    } else {
        Err(errors)
    }
}

pub fn lexer() -> impl Parser<char, Vec<Token>, Error = LError> {
    let whitespace = filter(|x: &char| x.is_inline_whitespace())
        .repeated()
        .at_least(1)
        .ignored();

    // I think declaring this and then cloning will be more performant than
    // calling the function on each invocation.
    let newline = newline();

    let comment = just('#').then(newline.not().repeated()).ignored();

    let ignored = choice((whitespace, comment)).repeated();

    let new_line = choice((newline, just(';').ignored())).to(TokenKind::NewLine);

    let control_multi = choice((
        just("=>").to(TokenKind::ArrowFat),
        just("==").to(TokenKind::Eq),
        just("!=").to(TokenKind::Ne),
        just(">=").to(TokenKind::Gte),
        just("<=").to(TokenKind::Lte),
        just("=~").to(TokenKind::RegexMatch),
        just("!~").to(TokenKind::RegexNotMatch),
    ));

    let keyword = choice(KEYWORDS.map(|kw| {
        just(kw)
            .then_ignore(end_word())
            .to(TokenKind::Keyword(kw.to_string()))
    }));

    // Tokens after which a `/` on the same line means division rather than the
    // start of a regular expression.
    let operand = choice((
        version().map(TokenKind::Version),
        literal().map(TokenKind::Literal),
        ident_part().map(TokenKind::Ident),
        one_of(")]}").map(TokenKind::Control),
    ))
    .map_with_span(|kind, span| Token { kind, span });

    let division = filter(|x: &char| x.is_inline_whitespace())
        .repeated()
        .ignore_then(just('/'))
        .map_with_span(|c, span: std::ops::Range<usize>| Token {
            kind: TokenKind::Control(c),
            // the span covers only the slash, not the whitespace before it
            span: (span.end - 1)..span.end,
        });

    let operand = operand
        .then(division.or_not())
        .map(|(token, division)| std::iter::once(token).chain(division).collect::<Vec<_>>());

    let control = one_of("([{,:.=<>+-*?").map(TokenKind::Control);

    // keywords must be tried before identifiers
    let single = choice((new_line, control_multi, keyword, control))
        .map_with_span(|kind, span| vec![Token { kind, span }]);

    let token = choice((single, operand)).boxed();

    ignored
        .clone()
        .ignore_then(token)
        .repeated()
        .flatten()
        .then_ignore(ignored)
        .then_ignore(end())
}

pub(crate) fn ident_part() -> impl Parser<char, String, Error = LError> + Clone {
    filter(|c: &char| c.is_alphabetic() || *c == '_')
        .chain(filter(|c: &char| c.is_alphanumeric() || *c == '_').repeated())
        .collect()
}

pub(crate) fn literal() -> impl Parser<char, Literal, Error = LError> + Clone {
    let bool = (just("true").to(true))
        .or(just("false").to(false))
        .then_ignore(end_word())
        .map(Literal::Boolean);

    let field = just('$').to(Literal::Field);

    choice((
        datetime(),
        duration(),
        number(),
        quoted_string().map(Literal::String),
        regex().map(Literal::Regexp),
        bool,
        field,
    ))
    .boxed()
}

fn number() -> impl Parser<char, Literal, Error = LError> + Clone {
    let digits = filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .collect::<String>();

    let frac = just('.').ignore_then(digits.clone());

    digits
        .then(frac.or_not())
        .then(just('u').or_not())
        .then_ignore(end_word())
        .try_map(|((int, frac), unsigned), span| match (frac, unsigned) {
            (Some(frac), None) => format!("{int}.{frac}")
                .parse::<f64>()
                .map(Literal::Float)
                .map_err(|e| Simple::custom(span, e.to_string())),
            (Some(_), Some(_)) => Err(Simple::custom(
                span,
                "unsigned suffix is not allowed on a float literal",
            )),
            (None, Some(_)) => int
                .parse::<u64>()
                .map(Literal::UnsignedInteger)
                .map_err(|_| Simple::custom(span, format!("integer literal {int} out of range"))),
            (None, None) => {
                if let Ok(i) = int.parse::<i64>() {
                    Ok(Literal::Integer(i))
                } else {
                    int.parse::<u64>()
                        .map(Literal::UnsignedInteger)
                        .map_err(|_| {
                            Simple::custom(span, format!("integer literal {int} out of range"))
                        })
                }
            }
        })
        .labelled("number")
}

fn duration() -> impl Parser<char, Literal, Error = LError> + Clone {
    // `ms` must be tried before `m`
    let unit = choice((
        just("ns").to(DurationUnit::Nanosecond),
        just("us").to(DurationUnit::Microsecond),
        just("µs").to(DurationUnit::Microsecond),
        just("μs").to(DurationUnit::Microsecond),
        just("ms").to(DurationUnit::Millisecond),
        just("s").to(DurationUnit::Second),
        just("m").to(DurationUnit::Minute),
        just("h").to(DurationUnit::Hour),
        just("d").to(DurationUnit::Day),
        just("w").to(DurationUnit::Week),
        just("y").to(DurationUnit::Year),
    ));

    let segment = text::digits(10)
        .then(unit)
        .try_map(|(magnitude, unit): (String, _), span| {
            let magnitude = magnitude
                .parse::<i64>()
                .map_err(|_| Simple::custom(span, "duration magnitude out of range"))?;
            Ok(DurationSegment { magnitude, unit })
        });

    segment
        .repeated()
        .at_least(1)
        .then_ignore(end_word())
        .map(Literal::Duration)
        .labelled("duration")
}

fn datetime() -> impl Parser<char, Literal, Error = LError> + Clone {
    let date = digits(4)
        .chain(just('-'))
        .chain::<char, _, _>(digits(2))
        .chain::<char, _, _>(just('-'))
        .chain::<char, _, _>(digits(2));

    let fraction = just('.')
        .chain(filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1))
        .or_not()
        .flatten();

    let offset = choice((
        just('Z').map(|x| vec![x]),
        one_of("-+")
            .chain(digits(2))
            .chain::<char, _, _>(just(':'))
            .chain::<char, _, _>(digits(2)),
    ))
    .or_not()
    .flatten();

    let time = digits(2)
        .chain::<char, _, _>(just(':'))
        .chain::<char, _, _>(digits(2))
        .chain::<char, _, _>(just(':'))
        .chain::<char, _, _>(digits(2))
        .chain::<char, _, _>(fraction)
        .chain::<char, _, _>(offset);

    date.chain(just('T'))
        .chain::<char, _, _>(time)
        .then_ignore(end_word())
        .collect::<String>()
        .map(Literal::DateTime)
        .labelled("date time")
        .boxed()
}

/// A dotted `major.minor.patch` version, with an optional pre-release suffix.
fn version() -> impl Parser<char, String, Error = LError> + Clone {
    let part = filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1);
    let pre_release = just('-')
        .chain(
            filter(|c: &char| c.is_ascii_alphanumeric() || *c == '.')
                .repeated()
                .at_least(1),
        )
        .or_not()
        .flatten();

    part.clone()
        .chain(just('.'))
        .chain::<char, _, _>(part.clone())
        .chain::<char, _, _>(just('.'))
        .chain::<char, _, _>(part)
        .chain::<char, _, _>(pre_release)
        .then_ignore(end_word())
        .collect()
        .labelled("version")
}

pub(crate) fn quoted_string() -> impl Parser<char, String, Error = LError> + Clone {
    let body = choice((escaped_character(), none_of("\\\"")))
        .repeated()
        .collect::<String>();

    just('"')
        .ignore_then(body)
        .then(just('"').or_not())
        .validate(|(string, closing), span, emit| {
            if closing.is_none() {
                emit(Simple::custom(span, "string literal not terminated"));
            }
            string
        })
        .labelled("string")
}

fn escaped_character() -> impl Parser<char, char, Error = LError> + Clone {
    let hex = |count: usize| {
        filter(|c: &char| c.is_ascii_hexdigit())
            .repeated()
            .exactly(count)
            .collect::<String>()
            .map(|digits| (digits, 16))
    };
    let octal = filter(|c: &char| ('0'..='7').contains(c))
        .repeated()
        .exactly(3)
        .collect::<String>()
        .map(|digits| (digits, 8));

    let code_point = choice((
        just('x').ignore_then(hex(2)),
        just('u').ignore_then(hex(4)),
        just('U').ignore_then(hex(8)),
        octal,
    ))
    .validate(|(digits, radix), span, emit| {
        u32::from_str_radix(&digits, radix)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or_else(|| {
                emit(Simple::custom(span, "invalid escape sequence"));
                char::REPLACEMENT_CHARACTER
            })
    });

    let invalid = any().validate(|c: char, span, emit| {
        emit(Simple::custom(
            span,
            format!("invalid escape sequence \\{}", c.escape_default()),
        ));
        c
    });

    just('\\').ignore_then(choice((
        just('"'),
        just('\\'),
        just('a').to('\x07'),
        just('b').to('\x08'),
        just('f').to('\x0C'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
        just('v').to('\x0B'),
        code_point,
        invalid,
    )))
}

/// A regular expression literal. The pattern keeps its escapes, except for
/// `\/` which becomes `/`.
pub(crate) fn regex() -> impl Parser<char, String, Error = LError> + Clone {
    let escaped_slash = just("\\/").to("/".to_string());

    let class_name = choice((
        filter(|c: &char| c.is_alphabetic()).map(|c: char| c.to_string()),
        filter(|c: &char| c.is_alphanumeric() || *c == '_')
            .repeated()
            .at_least(1)
            .collect::<String>()
            .delimited_by(just('{'), just('}'))
            .map(|name| format!("{{{name}}}")),
    ));

    let unicode_class = just('\\')
        .ignore_then(one_of("pP"))
        .then(class_name.or_not())
        .validate(|(p, name), span, emit| match name {
            Some(name) => format!("\\{p}{name}"),
            None => {
                emit(Simple::custom(span, "invalid unicode class escape"));
                format!("\\{p}")
            }
        });

    let escape = just('\\')
        .chain(none_of("\n"))
        .collect::<String>();

    let class_item = choice((
        just('\\').chain(none_of("\n")).collect::<String>(),
        none_of("]\\\n").map(|c: char| c.to_string()),
    ));

    let class = just('[')
        .ignore_then(class_item.repeated())
        .then(just(']').or_not())
        .validate(|(items, closing), span, emit| {
            if closing.is_none() {
                emit(Simple::custom(span, "character class not terminated"));
            }
            format!("[{}]", items.concat())
        });

    let item = choice((
        escaped_slash,
        unicode_class,
        escape,
        class,
        none_of("/\\[\n").map(|c: char| c.to_string()),
    ));

    just('/')
        .ignore_then(item.repeated().at_least(1))
        .then(just('/').or_not())
        .validate(|(items, closing), span, emit| {
            if closing.is_none() {
                emit(Simple::custom(span, "regular expression not terminated"));
            }
            items.concat()
        })
        .labelled("regular expression")
}

fn digits(count: usize) -> impl Parser<char, Vec<char>, Error = LError> + Clone {
    filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .exactly(count)
}

/// Succeeds without consuming input when the next char can't continue a word.
fn end_word() -> impl Parser<char, (), Error = LError> + Clone {
    choice((
        end(),
        filter(|c: &char| !(c.is_alphanumeric() || *c == '_')).ignored(),
    ))
    .rewind()
}

pub(crate) fn convert_lexer_error(source: &str, e: LError, source_id: u16) -> Error {
    let span = Span::new(source_id, e.span());

    let error = if let SimpleReason::Custom(message) = e.reason() {
        Error::new_simple(message)
    } else {
        // Spans count chars rather than bytes, so we can't index into the str.
        let found: String = source
            .chars()
            .skip(span.start)
            .take(span.end - span.start)
            .collect();
        let found = if found.is_empty() {
            "end of input".to_string()
        } else {
            format!("`{found}`")
        };
        Error::new(Reason::Unexpected { found })
    };

    error
        .with_span(Some(span))
        .with_code(codes::SYNTAX)
        .with_source(ErrorSource::Lexer)
}
