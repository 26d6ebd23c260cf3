use insta::{assert_debug_snapshot, assert_snapshot};

use crate::error::{codes, Error, ErrorSource, Errors, Reason, WithErrorInfo};
use crate::span::Span;

fn create_simple_error() -> Error {
    Error::new_simple("undefined identifier \"foo\"")
        .push_hint("did you mean \"for\"?")
        .with_code(codes::NAME)
}

#[test]
fn display() {
    assert_snapshot!(create_simple_error(), @r#"undefined identifier "foo""#);

    let errors = Errors(vec![
        create_simple_error(),
        Error::new(Reason::Unexpected {
            found: "`)`".to_string(),
        }),
    ]);
    assert_snapshot!(errors, @r#"
    undefined identifier "foo"
    unexpected `)`
    "#);
}

#[test]
fn test_simple_error() {
    let err = create_simple_error();
    assert_debug_snapshot!(err, @r#"
    Error {
        kind: Error,
        span: None,
        reason: Simple(
            "undefined identifier \"foo\"",
        ),
        hints: [
            "did you mean \"for\"?",
        ],
        code: Some(
            "E0003",
        ),
        source: Unknown,
    }
    "#);
}

#[test]
fn test_expected_reason() {
    let err = Error::new(Reason::Expected {
        who: Some("function parameter".to_string()),
        expected: "a literal".to_string(),
        found: "an identifier".to_string(),
    });
    assert_snapshot!(err, @"function parameter expected a literal, but found an identifier");

    let err = Error::new(Reason::NotFound {
        name: "universe".to_string(),
        namespace: "package".to_string(),
    });
    assert_snapshot!(err, @r#"package "universe" not found"#);
}

#[test]
fn test_bug_reason() {
    let err = Error::new_assert("kind mismatch");
    assert!(err.is_bug());
    assert_eq!(err.code, None);
    assert_snapshot!(err, @"internal compiler error; kind mismatch");
}

#[test]
fn test_result_decorators() {
    let span = Some(Span::new(0, 4..9));
    let result: Result<(), Error> = Err(Error::new_simple("bad argument"))
        .with_hints(vec!["first hint"])
        .push_hint("second hint")
        .with_span_fallback(span)
        .with_code(codes::ARGUMENT)
        .with_code_fallback(codes::SEMANTIC)
        .with_source(ErrorSource::Interpreter)
        .with_source(ErrorSource::Query);

    let err = result.unwrap_err();
    assert_eq!(err.hints, vec!["first hint", "second hint"]);
    assert_eq!(err.span, span);
    assert_eq!(err.code, Some("E0004"));
    assert_eq!(err.source, ErrorSource::Interpreter);
}
