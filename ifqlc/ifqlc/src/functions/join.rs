use std::collections::BTreeMap;

use ifqlc_parser::error::codes;
use serde::{Deserialize, Serialize};

use super::transform::{expect_single_param, string_array};
use super::JOIN;
use crate::interpreter::{Arguments, Value};
use crate::query::{Administration, OperationId, OperationSpec, Registry};
use crate::semantic::FunctionExpression;
use crate::{Error, Result, WithErrorInfo};

/// Joins the rows of several tables that agree on the `on` tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinOpSpec {
    #[serde(default)]
    pub on: Vec<String>,

    /// Computes a joined row from an object holding the row of each table,
    /// under the table's name.
    #[serde(rename = "fn")]
    pub function: FunctionExpression,

    /// The name of each parent inside the object passed to `fn`.
    #[serde(default)]
    pub table_names: BTreeMap<OperationId, String>,
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry.register_function(JOIN, create_join)?;
    registry.register_kind(JOIN, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Join)
    })?;
    Ok(())
}

fn create_join(args: &mut Arguments, admin: &mut Administration) -> Result<OperationSpec> {
    let function = args.get_required_function("fn")?;
    let function = admin.resolve(&function)?;
    expect_single_param(&function)?;

    let on = string_array(args, "on")?.unwrap_or_default();

    let mut table_names = BTreeMap::new();
    for (name, table) in args.get_map("tables")?.unwrap_or_default() {
        let Value::Table(id) = table else {
            return Err(Error::new_simple(format!(
                "tables key {name:?} must be a table, got {}",
                table.kind()
            ))
            .with_code(codes::ARGUMENT));
        };
        if let Some(first) = table_names.get(&id) {
            return Err(Error::new_simple(format!(
                "table \"{id}\" is passed to join more than once, as {first:?} and {name:?}"
            ))
            .with_code(codes::ARGUMENT));
        }
        admin.add_parent(id.clone());
        table_names.insert(id, name);
    }

    Ok(OperationSpec::Join(JoinOpSpec {
        on,
        function,
        table_names,
    }))
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::super::test::{compile, compile_error};
    use super::*;

    const JOIN_SOURCE: &str = r#"
cpu = from(db:"telegraf").range(start:-1h)
mem = from(db:"telegraf").range(start:-1h)
join(tables:{cpu:cpu, mem:mem}, on:["host"], fn: (t) => t.cpu._value + t.mem._value)
"#;

    #[test]
    fn test_join() {
        let spec = compile(JOIN_SOURCE).unwrap();

        let join = spec.operations.last().unwrap();
        assert_eq!(join.id.to_string(), "join4");
        let OperationSpec::Join(join_spec) = &join.spec else {
            panic!("expected a join, got {:?}", join.spec);
        };
        assert_eq!(join_spec.on, vec!["host"]);
        assert_snapshot!(
            serde_json::to_string(&join_spec.table_names).unwrap(),
            @r#"{"range1":"cpu","range3":"mem"}"#
        );

        let parents: Vec<_> = spec
            .parents(&join.id)
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(parents, vec!["range1", "range3"]);
    }

    #[test]
    fn test_join_errors() {
        assert_snapshot!(
            compile_error(r#"join(tables:{a:1}, fn: (t) => t)"#),
            @r#"error calling function "join": tables key "a" must be a table, got int"#
        );
        assert_snapshot!(
            compile_error(r#"join(tables:{})"#),
            @r#"error calling function "join": missing required keyword argument "fn""#
        );
        assert!(compile_error(r#"from(db:"a").join(fn: (t) => t)"#)
            .contains(r#"property "join" not found"#));
        assert_snapshot!(
            compile_error("t = from(db:\"a\")\njoin(tables:{a:t, b:t}, fn: (t) => t.a._value)"),
            @r#"error calling function "join": table "from0" is passed to join more than once, as "a" and "b""#
        );
    }
}
