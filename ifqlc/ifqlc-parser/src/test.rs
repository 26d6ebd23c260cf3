#![cfg(test)]

use insta::{assert_debug_snapshot, assert_yaml_snapshot};
use itertools::Itertools;

use crate::ast::*;
use crate::error::Error;

/// Helper that does not track source_ids
fn parse_single(source: &str) -> Result<Program, Vec<Error>> {
    crate::parse_source(source, 0)
}

fn error_messages(source: &str) -> Vec<String> {
    parse_single(source)
        .unwrap_err()
        .into_iter()
        .map(|e| e.to_string())
        .collect()
}

#[test]
fn test_call() {
    assert_yaml_snapshot!(parse_single(r#"select(db:"mydb")"#).unwrap(), @r#"
    body:
      - Expr:
          Call:
            callee:
              Ident: select
              span: "0:0-6"
            arguments:
              - key: db
                value:
                  Literal:
                    String: mydb
                  span: "0:10-16"
                span: "0:7-16"
          span: "0:0-17"
        span: "0:0-17"
    "#);
}

#[test]
fn test_var_def() {
    assert_yaml_snapshot!(parse_single("var x = 4h").unwrap(), @r#"
    body:
      - VarDef:
          name: x
          value:
            Literal:
              Duration:
                - magnitude: 4
                  unit: Hour
            span: "0:8-10"
        span: "0:0-10"
    "#);

    // `var` is optional
    let with = parse_single("var a = 1").unwrap();
    let without = parse_single("a = 1").unwrap();
    assert_eq!(with.body[0].kind, without.body[0].kind);
}

#[test]
fn test_pipeline_parse_tree() {
    let program = parse_single(
        r#"
# select the cpu measurement for the last hour
select(db:"mydb")
    .where(exp:{"t1"=="val1" and $ > 10})
    .range(start:-1h)
    .window(every:1m)
    .sum()
        "#,
    )
    .unwrap();
    assert_eq!(program.body.len(), 1);

    // walk the chain back to `select`
    let mut methods = Vec::new();
    let mut expr: &Expr = program.body[0].kind.as_expr().unwrap();
    while let ExprKind::Call(call) = &expr.kind {
        match &call.callee.kind {
            ExprKind::Member(member) => {
                methods.push(member.property.clone());
                expr = &member.object;
            }
            ExprKind::Ident(name) => {
                methods.push(name.clone());
                break;
            }
            other => panic!("unexpected callee {other:?}"),
        }
    }
    assert_eq!(methods, ["sum", "window", "range", "where", "select"]);
}

#[test]
fn test_package_and_imports() {
    let program = parse_single(
        r#"
package cpu 0.3.1
import "influxdata/stats" 1.2.0
import "helpers" as h

stats.mean(table: select(db:"telegraf"))
"#,
    )
    .unwrap();

    let package = program.package.as_ref().unwrap();
    assert_eq!(package.name, "cpu");
    assert_eq!(package.version, Some(semver::Version::new(0, 3, 1)));
    assert_debug_snapshot!(program.imports.iter().map(|i| (&i.path, i.version.as_ref().map(|v| v.to_string()), i.alias.as_deref())).collect_vec(), @r#"
    [
        (
            "influxdata/stats",
            Some(
                "^1.2.0",
            ),
            None,
        ),
        (
            "helpers",
            None,
            Some(
                "h",
            ),
        ),
    ]
    "#);
    assert_eq!(program.body.len(), 1);
}

#[test]
fn test_statement_separators() {
    let program = parse_single("a = 1; b = 2\n\n\nc = a + b\n").unwrap();
    let names = program
        .body
        .iter()
        .map(|s| s.kind.as_var_def().unwrap().name.as_str())
        .collect_vec();
    assert_eq!(names, ["a", "b", "c"]);

    assert_eq!(parse_single("").unwrap(), Program::default());
    assert_eq!(parse_single("\n# only a comment\n").unwrap(), Program::default());
}

#[test]
fn test_method_chain_across_lines() {
    let program = parse_single("a\n  .b()\n  .c()\nd").unwrap();
    assert_eq!(program.body.len(), 2);

    let chain = program.body[0].kind.as_expr().unwrap();
    let call = chain.kind.as_call().unwrap();
    let member = call.callee.kind.as_member().unwrap();
    assert_eq!(member.property, "c");
}

#[test]
fn test_return_statement() {
    let program = parse_single("f = (r) => {\n  x = r + 1\n  return x\n}").unwrap();
    let def = program.body[0].kind.as_var_def().unwrap();
    let func = def.value.kind.as_arrow_function().unwrap();
    let stmts = func.body.as_block().unwrap();
    assert_eq!(stmts.len(), 2);
    assert!(stmts[1].kind.is_return());
}

#[test]
fn test_error_import_order() {
    assert_eq!(
        error_messages("a = 1\nimport \"pkg\""),
        vec!["imports must precede other statements"]
    );
    assert_eq!(
        error_messages("import \"pkg\"\npackage foo"),
        vec!["package clause must be the first statement"]
    );
    assert!(error_messages(r#"import "pkg" "not a version""#)[0]
        .starts_with(r#"invalid version "not a version""#));
}

#[test]
fn test_error_unclosed_call() {
    let errors = parse_single(r#"select(db:"mydb""#).unwrap_err();
    assert_eq!(errors[0].code, Some("E0001"));
    assert_eq!(errors[0].source, crate::error::ErrorSource::Parser);
    // the span is moved back inside of the source
    assert_eq!(errors[0].span, Some(crate::span::Span::new(0, 15..16)));
}

#[test]
fn test_error_unexpected_token() {
    assert_debug_snapshot!(parse_single("a = = 1").unwrap_err()[0].span, @r"
    Some(
        0:4-5,
    )
    ");
}

#[test]
fn test_error_lexer_and_parser() {
    // lexer errors are reported with the parse errors that follow them
    let errors = parse_single("a = \"abc").unwrap_err();
    assert_eq!(errors[0].to_string(), "string literal not terminated");
    assert_eq!(errors[0].source, crate::error::ErrorSource::Lexer);
}

#[test]
fn test_unicode_source() {
    // spans are in chars
    let program = parse_single(r#"x = "héllo" + y"#).unwrap();
    let def = program.body[0].kind.as_var_def().unwrap();
    let binary = def.value.kind.as_binary().unwrap();
    assert_eq!(binary.right.span, Some(crate::span::Span::new(0, 14..15)));
}
