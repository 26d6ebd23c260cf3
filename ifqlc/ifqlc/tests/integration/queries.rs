//! Simple tests for "this query creates this spec" go here.
use ifqlc::{ErrorMessages, Options, QuerySpec};
use insta::assert_snapshot;
use rstest::rstest;

pub(crate) fn compile(source: &str) -> Result<QuerySpec, ErrorMessages> {
    ifqlc::compile_with(
        source,
        &Options::default().with_display(ifqlc::DisplayOptions::Plain),
    )
}

/// The spec as pretty JSON.
pub(crate) fn spec_json(source: &str) -> String {
    serde_json::to_string_pretty(&compile(source).unwrap()).unwrap()
}

/// One line per operation, then one per edge.
fn outline(spec: &QuerySpec) -> String {
    let operations = spec
        .operations
        .iter()
        .map(|op| format!("{}: {}", op.id, serde_json::to_string(&op.spec).unwrap()));
    let edges = spec
        .edges
        .iter()
        .map(|e| format!("{} -> {}", e.parent, e.child));
    operations.chain(edges).collect::<Vec<_>>().join("\n")
}

#[test]
fn test_select_range_sum() {
    assert_snapshot!(spec_json(r#"select(db:"mydb").range(start:-4h, stop:-2h).sum()"#), @r#"
    {
      "operations": [
        {
          "id": "select0",
          "kind": "select",
          "spec": {
            "database": "mydb",
            "hosts": []
          }
        },
        {
          "id": "range1",
          "kind": "range",
          "spec": {
            "start": "-4h",
            "stop": "-2h"
          }
        },
        {
          "id": "sum2",
          "kind": "sum",
          "spec": {}
        }
      ],
      "edges": [
        {
          "parent": "select0",
          "child": "range1"
        },
        {
          "parent": "range1",
          "child": "sum2"
        }
      ]
    }
    "#);
}

#[test]
fn test_select_range_count() {
    let spec = compile(r#"select(db:"mydb").range(start:-4h, stop:-2h).count()"#).unwrap();
    assert_snapshot!(outline(&spec), @r#"
    select0: {"database":"mydb","hosts":[]}
    range1: {"start":"-4h","stop":"-2h"}
    count2: {}
    select0 -> range1
    range1 -> count2
    "#);
}

#[test]
fn test_where_tags() {
    let spec = compile(
        r#"select(db:"mydb").where(exp:{("t1"=="val1") and ("t2"=="val2")}).range(start:-4h, stop:-2h).count()"#,
    )
    .unwrap();
    assert_eq!(spec.operations.len(), 4);

    let where_op = &spec.operations[1];
    assert_eq!(where_op.id.to_string(), "where1");
    assert_snapshot!(serde_json::to_string_pretty(&where_op.spec).unwrap(), @r#"
    {
      "expression": {
        "root": {
          "type": "binary",
          "operator": "and",
          "left": {
            "type": "binary",
            "operator": "==",
            "left": {
              "type": "reference",
              "name": "t1",
              "kind": "tag"
            },
            "right": {
              "type": "stringLiteral",
              "value": "val1"
            }
          },
          "right": {
            "type": "binary",
            "operator": "==",
            "left": {
              "type": "reference",
              "name": "t2",
              "kind": "tag"
            },
            "right": {
              "type": "stringLiteral",
              "value": "val2"
            }
          }
        },
        "params": []
      }
    }
    "#);
}

#[test]
fn test_where_regex() {
    let spec = compile(r#"select(db:"mydb").where(exp:{"t1"==/va\/l1/ and "t2" != /val2/})"#).unwrap();
    assert_snapshot!(outline(&spec), @r#"
    select0: {"database":"mydb","hosts":[]}
    where1: {"expression":{"root":{"type":"binary","operator":"and","left":{"type":"binary","operator":"regexpMatch","left":{"type":"reference","name":"t1","kind":"tag"},"right":{"type":"regexpLiteral","value":"va/l1"}},"right":{"type":"binary","operator":"regexpNotMatch","left":{"type":"reference","name":"t2","kind":"tag"},"right":{"type":"regexpLiteral","value":"val2"}}},"params":[]}}
    select0 -> where1
    "#);
}

#[test]
fn test_window_period_defaults_to_every() {
    let spec = compile(r#"select(db:"mydb").window(start:-4h, every:1h)"#).unwrap();
    assert_snapshot!(outline(&spec), @r#"
    select0: {"database":"mydb","hosts":[]}
    window1: {"every":"1h","period":"1h","start":"-4h","round":"0s"}
    select0 -> window1
    "#);
}

#[test]
fn test_arrow_functions() {
    // evaluates without creating any operation
    let spec = compile("plusSix = (r) => r + 6\nplusSix(r:1) == 7").unwrap();
    assert!(spec.operations.is_empty());

    let errors = compile("plusSix = (r) => r + 6\nplusSix(r:1, bogus:2)").unwrap_err();
    assert_snapshot!(errors.inner[0].reason, @r#"error calling function "plusSix": unused arguments [bogus]"#);
    assert_eq!(errors.inner[0].code.as_deref(), Some("E0004"));
}

#[test]
fn test_variables_and_branches() {
    let spec = compile(
        r#"
telegraf = from(db:"telegraf").range(start:-1h)
telegraf.where(exp:{"_measurement" == "cpu"}).sum()
telegraf.where(exp:{"_measurement" == "mem"}).mean()
"#,
    )
    .unwrap();
    assert_snapshot!(
        spec.operations.iter().map(|op| op.id.to_string()).collect::<Vec<_>>().join(", "),
        @"from0, range1, where2, sum3, where4, mean5"
    );
    assert_eq!(spec.roots().len(), 1);
    assert_eq!(spec.children(&"range1".into()).len(), 2);
}

#[test]
fn test_join() {
    let spec = compile(
        r#"
cpu = from(db:"telegraf").where(exp:{"_measurement" == "cpu"})
mem = from(db:"telegraf").where(exp:{"_measurement" == "mem"})
join(tables:{cpu:cpu, mem:mem}, on:["host"], fn: (t) => t.cpu._value / t.mem._value)
"#,
    )
    .unwrap();

    let edges: Vec<_> = spec
        .edges
        .iter()
        .map(|e| format!("{} -> {}", e.parent, e.child))
        .collect();
    assert_eq!(
        edges,
        vec![
            "from0 -> where1",
            "from2 -> where3",
            "where1 -> join4",
            "where3 -> join4"
        ]
    );
}

#[test]
fn test_walk_order() {
    let spec = compile(
        r#"
a = from(db:"a")
b = from(db:"b").limit(limit:5)
join(tables:{a:a, b:b}, fn: (t) => t.a._value).sum()
"#,
    )
    .unwrap();

    let mut seen = Vec::new();
    spec.walk(|op| {
        seen.push(op.id.clone());
        Ok(())
    })
    .unwrap();
    assert_eq!(seen.len(), spec.operations.len());
    for edge in &spec.edges {
        let parent = seen.iter().position(|id| id == &edge.parent).unwrap();
        let child = seen.iter().position(|id| id == &edge.child).unwrap();
        assert!(parent < child, "{} should come before {}", edge.parent, edge.child);
    }
}

#[rstest]
#[case(r#"from(db:"mydb")"#)]
#[case(r#"from(db:"mydb").range(start:-1h).filter(fn: (r) => r._value > 0).limit(limit:10)"#)]
#[case(r#"from(db:"mydb").group(by:["host"]).sort(cols:["_time"], desc:true).first()"#)]
#[case(r#"from(db:"mydb").sample(n:3).window(every:5m, period:10m).stddev()"#)]
fn test_ids_are_kind_and_counter(#[case] source: &str) {
    let spec = compile(source).unwrap();
    spec.validate().unwrap();

    for (n, op) in spec.operations.iter().enumerate() {
        assert_eq!(op.id.to_string(), format!("{}{n}", op.kind()));
    }
    for edge in &spec.edges {
        assert_ne!(edge.parent, edge.child);
    }
}

#[test]
fn test_duration_units() {
    let spec = compile(r#"from(db:"a").window(every:1d, period:1w, round:1y)"#).unwrap();
    assert_snapshot!(
        serde_json::to_string(&spec.operations[1].spec).unwrap(),
        @r#"{"every":"24h","period":"168h","start":"now","round":"8760h"}"#
    );
}

#[test]
fn test_resolve() {
    use ifqlc::importer::NullImporter;
    use ifqlc::interpreter::{Interpreter, Value};

    let program = ifqlc::ifql_to_ast("x = 42\nf = (r) => r + x\ng = f.resolve()\nh = g.resolve()")
        .and_then(ifqlc::ast_to_semantic)
        .unwrap();

    let registry = ifqlc::query::registry().unwrap();
    let mut interpreter = Interpreter::new(registry, &NullImporter, ".".into());
    interpreter.eval(&program).unwrap();

    let g = interpreter.lookup("g").unwrap();
    assert!(matches!(g, Value::Function(_)));
    assert_snapshot!(g.to_string(), @"(r) => (r + 42)");

    // nothing is left to resolve the second time
    assert_eq!(interpreter.lookup("h").unwrap().to_string(), g.to_string());

    // resolving doesn't touch the original
    assert_snapshot!(interpreter.lookup("f").unwrap().to_string(), @"(r) => (r + x)");
}
