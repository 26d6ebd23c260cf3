//! Row functions taken from compiled queries, run against rows.
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use ifqlc::compiler::{self, CompilationCache, ReferencePath, Scope, Type, Value};
use ifqlc::query::OperationSpec;
use ifqlc::semantic::FunctionExpression;

use super::queries::compile;

/// The function of the `filter` or `map` at `index`.
fn row_function(source: &str, index: usize) -> FunctionExpression {
    let spec = compile(source).unwrap();
    match &spec.operations[index].spec {
        OperationSpec::Filter(f) | OperationSpec::Map(f) => f.function.clone(),
        other => panic!("expected a row function, got {}", other.kind()),
    }
}

fn types(entries: &[(&str, Type)]) -> HashMap<ReferencePath, Type> {
    entries.iter().map(|(p, t)| (p.to_string(), *t)).collect()
}

#[test]
fn test_filter_with_captured_threshold() {
    let function = row_function(
        "threshold = 10.0\nfrom(db:\"telegraf\").filter(fn: (r) => r._value > threshold and r.host == \"a\")",
        1,
    );
    assert_eq!(
        compiler::find_references(&function).unwrap(),
        vec!["r._value", "r.host"]
    );

    let compiled = compiler::compile(
        &function,
        &types(&[("r._value", Type::Float), ("r.host", Type::String)]),
    )
    .unwrap();
    assert_eq!(compiled.kind(), Type::Bool);

    let row = |value: f64, host: &str| -> Scope {
        [
            ("r._value", Value::Float(value)),
            ("r.host", Value::String(host.to_string())),
        ]
        .into_iter()
        .collect()
    };
    assert!(compiled.eval_bool(&row(12.5, "a")).unwrap());
    assert!(!compiled.eval_bool(&row(12.5, "b")).unwrap());
    assert!(!compiled.eval_bool(&row(2.0, "a")).unwrap());
}

#[test]
fn test_map_to_object() {
    let function = row_function(
        "from(db:\"telegraf\").map(fn: (r) => ({_value: r._value * 2, host: r.host}))",
        1,
    );
    let compiled = compiler::compile(
        &function,
        &types(&[("r._value", Type::Int), ("r.host", Type::String)]),
    )
    .unwrap();
    assert_eq!(compiled.kind(), Type::Map);

    let scope: Scope = [
        ("r._value", Value::Int(21)),
        ("r.host", Value::String("a".to_string())),
    ]
    .into_iter()
    .collect();
    let map = compiled.eval_map(&scope).unwrap();
    assert_eq!(map.get("_value"), Some(&Value::Int(42)));
    assert_eq!(map.get("host"), Some(&Value::String("a".to_string())));
}

#[test]
fn test_cache_per_signature() {
    let function = row_function("from(db:\"telegraf\").map(fn: (r) => r._value + r._value)", 1);
    let paths = compiler::find_references(&function).unwrap();
    let cache = CompilationCache::new(function, paths);

    let ints = cache.compile(&types(&[("r._value", Type::Int)])).unwrap();
    let floats = cache.compile(&types(&[("r._value", Type::Float)])).unwrap();
    assert_eq!(ints.kind(), Type::Int);
    assert_eq!(floats.kind(), Type::Float);

    let again = cache.compile(&types(&[("r._value", Type::Int)])).unwrap();
    assert!(Arc::ptr_eq(&ints, &again));

    // a row whose types don't match what the function was compiled for
    let scope: Scope = [("r._value", Value::Float(1.0))].into_iter().collect();
    let error = ints.eval(&scope).unwrap_err();
    assert_eq!(
        error.to_string(),
        r#"missing or incorrectly typed value found in scope for name "r._value""#
    );
}

#[test]
fn test_cache_shared_between_threads() {
    let function = row_function("from(db:\"telegraf\").map(fn: (r) => r._value * r._value)", 1);
    let paths = compiler::find_references(&function).unwrap();
    let cache = CompilationCache::new(function, paths);
    let floats = types(&[("r._value", Type::Float)]);

    let compiled: Vec<_> = thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| s.spawn(|| cache.compile(&floats).unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(compiled.len(), 8);
    assert!(compiled.iter().all(|c| Arc::ptr_eq(c, &compiled[0])));
    assert!(Arc::ptr_eq(&compiled[0], &cache.compile(&floats).unwrap()));
}

#[test]
fn test_block_with_statements_after_return() {
    let function = row_function(
        "from(db:\"telegraf\").filter(fn: (r) => {\n  return r.x\n  v = r.y\n})",
        1,
    );
    let error = compiler::compile(&function, &types(&[("r.x", Type::Int), ("r.y", Type::Int)]))
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "return statement is not the last statement in the block"
    );
    assert_eq!(error.code, Some("E0002"));
}
