use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::interpreter::Arguments;
use crate::query::{CreateFn, OperationSpec, Registry};
use crate::Result;

/// Functions that pick one row of each table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SelectorKind {
    First,
    Last,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorOpSpec {
    /// Take the time of the selected row rather than the window bounds.
    #[serde(rename = "useRowtime")]
    pub use_row_time: bool,
}

/// Functions that reduce each table to a single value. They take no
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum AggregateKind {
    Count,
    Sum,
    Mean,
    Mode,
    Skew,
    Spread,
    Stddev,
}

impl SelectorKind {
    fn create(self) -> CreateFn {
        macro_rules! create {
            ($kind:ident) => {
                |args, _| selector_spec(args).map(|spec| OperationSpec::Selector(SelectorKind::$kind, spec))
            };
        }
        match self {
            SelectorKind::First => create!(First),
            SelectorKind::Last => create!(Last),
            SelectorKind::Min => create!(Min),
            SelectorKind::Max => create!(Max),
        }
    }
}

impl AggregateKind {
    fn create(self) -> CreateFn {
        macro_rules! create {
            ($kind:ident) => {
                |_, _| Ok(OperationSpec::Aggregate(AggregateKind::$kind))
            };
        }
        match self {
            AggregateKind::Count => create!(Count),
            AggregateKind::Sum => create!(Sum),
            AggregateKind::Mean => create!(Mean),
            AggregateKind::Mode => create!(Mode),
            AggregateKind::Skew => create!(Skew),
            AggregateKind::Spread => create!(Spread),
            AggregateKind::Stddev => create!(Stddev),
        }
    }
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    for kind in SelectorKind::iter() {
        let name: &'static str = kind.into();
        registry.register_method(name, kind.create())?;
        registry.register_kind(name, |name, spec| {
            let kind = selector_kind(name);
            serde_json::from_value(spec).map(|spec| OperationSpec::Selector(kind, spec))
        })?;
    }

    for kind in AggregateKind::iter() {
        let name: &'static str = kind.into();
        registry.register_method(name, kind.create())?;
        registry.register_kind(name, |name, _| Ok(OperationSpec::Aggregate(aggregate_kind(name))))?;
    }
    Ok(())
}

fn selector_spec(args: &mut Arguments) -> Result<SelectorOpSpec> {
    let use_row_time = args.get_bool("useRowTime")?.unwrap_or_default();
    Ok(SelectorOpSpec { use_row_time })
}

// decoders are only registered under the names of their kinds
fn selector_kind(name: &str) -> SelectorKind {
    SelectorKind::iter()
        .find(|k| <&'static str>::from(k) == name)
        .unwrap_or(SelectorKind::First)
}

fn aggregate_kind(name: &str) -> AggregateKind {
    AggregateKind::iter()
        .find(|k| <&'static str>::from(k) == name)
        .unwrap_or(AggregateKind::Count)
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::super::test::{compile, compile_error, last_spec};
    use super::*;
    use crate::query::registry;

    #[test]
    fn test_selectors() {
        assert_snapshot!(last_spec(r#"from(db:"mydb").first()"#), @r#"first1: {"useRowtime":false}"#);
        assert_snapshot!(last_spec(r#"from(db:"mydb").max(useRowTime:true)"#), @r#"max1: {"useRowtime":true}"#);
    }

    #[test]
    fn test_aggregates() {
        let spec = compile(
            r#"from(db:"mydb").count().sum().mean().mode().skew().spread().stddev()"#,
        )
        .unwrap();
        let kinds: Vec<_> = spec.operations.iter().map(|op| op.spec.kind()).collect();
        assert_eq!(
            kinds,
            vec!["from", "count", "sum", "mean", "mode", "skew", "spread", "stddev"]
        );
        assert_snapshot!(last_spec(r#"from(db:"mydb").spread()"#), @"spread1: {}");

        assert_snapshot!(
            compile_error(r#"from(db:"mydb").sum(column:"x")"#),
            @r#"error calling function "sum": unused arguments [column]"#
        );
    }

    #[test]
    fn test_decode() {
        let registry = registry().unwrap();
        assert_eq!(
            registry.decode("last", serde_json::json!({"useRowtime": true})),
            Ok(OperationSpec::Selector(
                SelectorKind::Last,
                SelectorOpSpec { use_row_time: true }
            ))
        );
        assert_eq!(
            registry.decode("stddev", serde_json::Value::Null),
            Ok(OperationSpec::Aggregate(AggregateKind::Stddev))
        );
    }
}
