//! Query specs survive a trip through JSON.
use ifqlc::json;
use rstest::rstest;

use super::queries::compile;

#[rstest]
#[case(r#"select(db:"mydb").range(start:-4h, stop:-2h).sum()"#)]
#[case(r#"select(db:"mydb").where(exp:{"t1"==/va\/l1/ and "t2" != /val2/ and $ > 10})"#)]
#[case(r#"from(db:"mydb").where(exp:{$ > 9223372036854775807 or $ < -9223372036854775807})"#)]
#[case(r#"from(db:"mydb", hosts:["a:8082"]).window(start:2017-10-10T00:00:00Z, every:1h, round:1s)"#)]
#[case(r#"from(db:"mydb").filter(fn: (r) => r._value > 1.5 and r.host =~ /^a/).map(fn: (r) => ({v: r._value}))"#)]
#[case(r#"from(db:"mydb").group(except:["_time"]).sort(desc:true).sample(n:5, pos:1).last(useRowTime:true)"#)]
#[case("x = 1.0 / 4.0\nfrom(db:\"a\").where(exp:{$ > x}).filter(fn: (r) => r._value < x)")]
#[case(r#"
a = from(db:"a").limit(limit:1, offset:2)
b = from(db:"b")
join(tables:{a:a, b:b}, on:["host"], fn: (t) => t.a._value + t.b._value).mean()
"#)]
fn test_spec_round_trip(#[case] source: &str) {
    let spec = compile(source).unwrap();

    let text = json::from_spec(&spec).unwrap();
    let decoded = json::to_spec(&text).unwrap();
    similar_asserts::assert_eq!(decoded, spec);
    similar_asserts::assert_eq!(json::from_spec(&decoded).unwrap(), text);
}

#[rstest]
#[case("x = 0.0 / 0.0\nfrom(db:\"a\").where(exp:{$ > x})", "NaN")]
#[case("x = 1.0 / 0.0\nfrom(db:\"a\").filter(fn: (r) => r._value > x)", "inf")]
#[case("x = -1.0 / 0.0\nfrom(db:\"a\").map(fn: (r) => r._value * x)", "-inf")]
fn test_non_finite_float(#[case] source: &str, #[case] float: &str) {
    let error = compile(source).unwrap_err();
    let reason = &error.inner[0].reason;
    assert!(
        reason.contains(&format!("non-finite float {float} cannot be used in a query")),
        "{reason}"
    );
    assert_eq!(error.inner[0].code.as_deref(), Some("E0005"));
}

#[test]
fn test_unknown_kind() {
    let error = json::to_spec(
        r#"{"operations":[{"id":"bogus0","kind":"bogus","spec":{}}],"edges":[]}"#,
    )
    .unwrap_err();
    assert!(
        error.inner[0].reason.contains("bogus"),
        "{}",
        error.inner[0].reason
    );
}

#[test]
fn test_ast_json() {
    let ast = ifqlc::ifql_to_ast("x = 1").unwrap();
    let text = json::from_ast(&ast).unwrap();
    assert!(text.starts_with('{'));
    assert!(text.contains(r#""x""#));
}

#[test]
fn test_empty_spec() {
    let spec = compile("x = 1").unwrap();
    assert_eq!(
        json::from_spec(&spec).unwrap(),
        r#"{"operations":[],"edges":[]}"#
    );
}
