use chumsky::Parser;
use insta::assert_debug_snapshot;

use crate::lexer::lr::{DurationSegment, DurationUnit, Literal, TokenKind, Tokens};
use crate::lexer::{lex_source, lexer, literal, quoted_string, regex};

fn kinds(source: &str) -> Vec<TokenKind> {
    lexer()
        .parse(source)
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn lex_error_messages(source: &str) -> Vec<String> {
    lex_source(source, 0)
        .unwrap_err()
        .into_iter()
        .map(|e| e.to_string())
        .collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Ident(name.to_string())
}

fn keyword(name: &str) -> TokenKind {
    TokenKind::Keyword(name.to_string())
}

#[test]
fn debug_display() {
    assert_debug_snapshot!(Tokens(lexer().parse(r#"select(db:"mydb").range(start:-4h)"#).unwrap()), @r#"
    Tokens(
        [
            0..6: Ident("select"),
            6..7: Control('('),
            7..9: Ident("db"),
            9..10: Control(':'),
            10..16: Literal(String("mydb")),
            16..17: Control(')'),
            17..18: Control('.'),
            18..23: Ident("range"),
            23..24: Control('('),
            24..29: Ident("start"),
            29..30: Control(':'),
            30..31: Control('-'),
            31..33: Literal(Duration([DurationSegment { magnitude: 4, unit: Hour }])),
            33..34: Control(')'),
        ],
    )
    "#);
}

#[test]
fn regex_or_division() {
    assert_debug_snapshot!(Tokens(lexer().parse("a / 2").unwrap()), @r#"
    Tokens(
        [
            0..1: Ident("a"),
            2..3: Control('/'),
            4..5: Literal(Integer(2)),
        ],
    )
    "#);

    assert_debug_snapshot!(Tokens(lexer().parse(r"x =~ /a\/b/").unwrap()), @r#"
    Tokens(
        [
            0..1: Ident("x"),
            2..4: RegexMatch,
            5..11: Literal(Regexp("a/b")),
        ],
    )
    "#);

    // after a closing paren it's division again
    assert_eq!(
        kinds("(a)/b"),
        vec![
            TokenKind::Control('('),
            ident("a"),
            TokenKind::Control(')'),
            TokenKind::Control('/'),
            ident("b"),
        ]
    );

    // a slash on a new line starts a regex
    assert_eq!(
        kinds("a\n/b/"),
        vec![
            ident("a"),
            TokenKind::NewLine,
            TokenKind::Literal(Literal::Regexp("b".to_string())),
        ]
    );
}

#[test]
fn keywords() {
    assert_eq!(
        kinds("var x = not empty y"),
        vec![
            keyword("var"),
            ident("x"),
            TokenKind::Control('='),
            keyword("not"),
            keyword("empty"),
            ident("y"),
        ]
    );

    // keywords are only matched as whole words
    assert_eq!(
        kinds("variable android inside"),
        vec![ident("variable"), ident("android"), ident("inside")]
    );

    assert_eq!(
        kinds("true false trueish"),
        vec![
            TokenKind::Literal(Literal::Boolean(true)),
            TokenKind::Literal(Literal::Boolean(false)),
            ident("trueish"),
        ]
    );
}

#[test]
fn comments_and_separators() {
    assert_eq!(
        kinds("a # comment\nb; c"),
        vec![
            ident("a"),
            TokenKind::NewLine,
            ident("b"),
            TokenKind::NewLine,
            ident("c"),
        ]
    );
}

#[test]
fn operators() {
    assert_eq!(
        kinds("a == b != c <= d >= e !~ f => g"),
        vec![
            ident("a"),
            TokenKind::Eq,
            ident("b"),
            TokenKind::Ne,
            ident("c"),
            TokenKind::Lte,
            ident("d"),
            TokenKind::Gte,
            ident("e"),
            TokenKind::RegexNotMatch,
            ident("f"),
            TokenKind::ArrowFat,
            ident("g"),
        ]
    );
}

#[test]
fn numbers() {
    assert_eq!(literal().parse("42").unwrap(), Literal::Integer(42));
    assert_eq!(literal().parse("42u").unwrap(), Literal::UnsignedInteger(42));
    assert_eq!(literal().parse("1.5").unwrap(), Literal::Float(1.5));

    // too large for an i64, but fits in a u64
    assert_eq!(
        literal().parse("18446744073709551615").unwrap(),
        Literal::UnsignedInteger(u64::MAX)
    );

    assert!(literal().parse("99999999999999999999").is_err());
    assert!(literal().parse("1.5u").is_err());
}

#[test]
fn durations() {
    fn segment(magnitude: i64, unit: DurationUnit) -> DurationSegment {
        DurationSegment { magnitude, unit }
    }

    assert_eq!(
        literal().parse("1h30m").unwrap(),
        Literal::Duration(vec![
            segment(1, DurationUnit::Hour),
            segment(30, DurationUnit::Minute)
        ])
    );
    assert_eq!(
        literal().parse("5ms").unwrap(),
        Literal::Duration(vec![segment(5, DurationUnit::Millisecond)])
    );
    assert_eq!(
        literal().parse("3µs").unwrap(),
        Literal::Duration(vec![segment(3, DurationUnit::Microsecond)])
    );
    assert_eq!(
        literal().parse("2w1d").unwrap(),
        Literal::Duration(vec![
            segment(2, DurationUnit::Week),
            segment(1, DurationUnit::Day)
        ])
    );
}

#[test]
fn datetimes() {
    assert_eq!(
        literal().parse("2017-01-01T00:00:00Z").unwrap(),
        Literal::DateTime("2017-01-01T00:00:00Z".to_string())
    );
    assert_eq!(
        literal().parse("2017-01-01T12:30:00.123456-07:00").unwrap(),
        Literal::DateTime("2017-01-01T12:30:00.123456-07:00".to_string())
    );
}

#[test]
fn versions() {
    assert_eq!(
        kinds(r#"import "pkg" 1.2.0"#),
        vec![
            keyword("import"),
            TokenKind::Literal(Literal::String("pkg".to_string())),
            TokenKind::Version("1.2.0".to_string()),
        ]
    );
}

#[test]
fn strings() {
    assert_eq!(quoted_string().parse(r#""hello""#).unwrap(), "hello");
    assert_eq!(
        quoted_string().parse(r#""a\"b\\c\n""#).unwrap(),
        "a\"b\\c\n"
    );
    // hex, octal and unicode escapes
    assert_eq!(
        quoted_string().parse(r#""\x41\101é\U0001F422""#).unwrap(),
        "AAé🐢"
    );
}

#[test]
fn regexes() {
    assert_eq!(regex().parse(r"/va\/l1/").unwrap(), "va/l1");
    assert_eq!(regex().parse(r"/^cpu\d+$/").unwrap(), r"^cpu\d+$");
    assert_eq!(regex().parse(r"/[a/b]/").unwrap(), "[a/b]");
    assert_eq!(regex().parse(r"/\p{Greek}\pL/").unwrap(), r"\p{Greek}\pL");
}

#[test]
fn errors() {
    assert_eq!(
        lex_error_messages(r#"x = "abc"#),
        vec!["string literal not terminated"]
    );
    assert_eq!(
        lex_error_messages("x =~ /abc"),
        vec!["regular expression not terminated"]
    );
    assert!(lex_error_messages("x =~ /[abc/")
        .contains(&"character class not terminated".to_string()));
    assert_eq!(
        lex_error_messages(r#""\q""#),
        vec![r"invalid escape sequence \q"]
    );
    assert_eq!(
        lex_error_messages(r"x =~ /\p1/"),
        vec!["invalid unicode class escape"]
    );

    let errors = lex_source("a ! b", 0).unwrap_err();
    assert_eq!(errors[0].code, Some("E0001"));
    assert!(errors[0].span.is_some());
}

#[test]
fn error_span() {
    let errors = lex_source(r#"x = "abc"#, 0).unwrap_err();
    assert_debug_snapshot!(errors[0].span, @r"
    Some(
        0:4-8,
    )
    ");
}
