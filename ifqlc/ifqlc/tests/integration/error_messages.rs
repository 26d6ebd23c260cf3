//! Errors as the caller sees them: reason, code, location and the rendered
//! report.
use insta::assert_snapshot;
use rstest::rstest;

use super::queries::compile;

#[rstest]
#[case::unterminated_string("x = \"abc", "string literal not terminated", "E0001")]
#[case::unterminated_regex("x = \"a\" =~ /abc", "regular expression not terminated", "E0001")]
#[case::default_not_literal("n = 1\nf = (r, x=n) => r", r#"function parameter "x" default value is not a literal"#, "E0002")]
#[case::unknown_identifier("x = 1\ny = x + z", r#"identifier "z" not found"#, "E0003")]
#[case::unknown_method(r#"from(db:"a").bogus()"#, r#"property "bogus" not found"#, "E0003")]
#[case::missing_argument("from()", r#"error calling function "from": missing required keyword argument "db""#, "E0004")]
#[case::wrong_type("x = 1 + \"a\"", "unsupported binary expression int + string", "E0005")]
#[case::no_return("f = (r) => {\n  v = r\n}\nf(r:1)", r#"error calling function "f": arrow function has no return value"#, "E0002")]
fn test_reason_and_code(#[case] source: &str, #[case] reason: &str, #[case] code: &str) {
    let errors = compile(source).unwrap_err();
    let error = &errors.inner[0];
    similar_asserts::assert_eq!(error.reason, reason);
    assert_eq!(error.code.as_deref(), Some(code));
}

#[test]
fn test_location() {
    let errors = compile("x = 1\ny = x + z").unwrap_err();
    let location = errors.inner[0].location.as_ref().unwrap();
    assert_eq!(location.start, (1, 8));
    assert_eq!(location.end, (1, 9));
}

#[test]
fn test_rendered_report() {
    let errors = compile("x = 1\ny = x + z").unwrap_err();
    let display = errors.to_string();

    assert!(display.contains("[E0003] Error"), "{display}");
    assert!(display.contains("y = x + z"), "{display}");
    assert!(display.contains(r#"identifier "z" not found"#), "{display}");
    assert!(!display.contains('\u{1b}'), "{display}");
}

#[test]
fn test_json() {
    let errors = compile("from()").unwrap_err();
    let json = errors.to_json().unwrap();
    assert!(json.contains(r#""code":"E0004""#), "{json}");
    assert!(json.contains(r#""source":"Interpreter""#), "{json}");
}

#[test]
fn test_invalid_spec_is_rejected() {
    let errors = ifqlc::json::to_spec(
        r#"{"operations":[{"id":"from0","kind":"from","spec":{"database":"a"}}],"edges":[{"parent":"from0","child":"sum1"}]}"#,
    )
    .and_then(|spec| spec.validate().map_err(Into::into))
    .unwrap_err();
    assert_snapshot!(errors.inner[0].reason, @r#"edge references an unknown child operation "sum1""#);
}
