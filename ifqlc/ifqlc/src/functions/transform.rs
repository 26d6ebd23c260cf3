use ifqlc_parser::error::codes;
use serde::{Deserialize, Serialize};

use super::*;
use crate::expression::Expression;
use crate::interpreter::Arguments;
use crate::query::{Administration, OperationSpec, Registry};
use crate::semantic::{FunctionExpression, Kind};
use crate::time::{Duration, Time};
use crate::{Error, Result, WithErrorInfo};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeOpSpec {
    pub start: Time,
    pub stop: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereOpSpec {
    pub expression: Expression,
}

/// Spec of `filter` and `map`: a function of one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnOpSpec {
    #[serde(rename = "fn")]
    pub function: FunctionExpression,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOpSpec {
    pub every: Duration,
    pub period: Duration,
    pub start: Time,
    pub round: Duration,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitOpSpec {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupOpSpec {
    pub by: Vec<String>,
    pub keep: Vec<String>,
    pub except: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOpSpec {
    pub cols: Vec<String>,
    pub desc: bool,
}

impl Default for SortOpSpec {
    fn default() -> Self {
        SortOpSpec {
            cols: vec![DEFAULT_SORT_COLUMN.to_string()],
            desc: false,
        }
    }
}

/// Picks every `n`-th row, starting at `pos`. A negative position picks a
/// random offset per table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleOpSpec {
    #[serde(rename = "useRowtime")]
    pub use_row_time: bool,
    pub n: i64,
    pub pos: i64,
}

impl Default for SampleOpSpec {
    fn default() -> Self {
        SampleOpSpec {
            use_row_time: false,
            n: 0,
            pos: -1,
        }
    }
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry.register_method(RANGE, create_range)?;
    registry.register_kind(RANGE, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Range)
    })?;

    registry.register_method(WHERE, create_where)?;
    registry.register_kind(WHERE, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Where)
    })?;

    registry.register_method(FILTER, |args, admin| {
        function_spec(args, admin).map(OperationSpec::Filter)
    })?;
    registry.register_kind(FILTER, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Filter)
    })?;

    registry.register_method(MAP, |args, admin| {
        function_spec(args, admin).map(OperationSpec::Map)
    })?;
    registry.register_kind(MAP, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Map)
    })?;

    registry.register_method(WINDOW, create_window)?;
    registry.register_kind(WINDOW, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Window)
    })?;

    registry.register_method(LIMIT, create_limit)?;
    registry.register_kind(LIMIT, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Limit)
    })?;

    registry.register_method(GROUP, create_group)?;
    registry.register_kind(GROUP, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Group)
    })?;

    registry.register_method(SORT, create_sort)?;
    registry.register_kind(SORT, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Sort)
    })?;

    registry.register_method(SAMPLE, create_sample)?;
    registry.register_kind(SAMPLE, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Sample)
    })?;
    Ok(())
}

fn create_range(args: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
    let start = args.get_required_time("start")?;
    let stop = args.get_time("stop")?.unwrap_or(Time::NOW);
    Ok(OperationSpec::Range(RangeOpSpec { start, stop }))
}

fn create_where(args: &mut Arguments, admin: &mut Administration) -> Result<OperationSpec> {
    let function = args.get_required_function("exp")?;
    let function = admin.resolve(&function)?;
    let expression = Expression::from_predicate(&function)?;
    Ok(OperationSpec::Where(WhereOpSpec { expression }))
}

fn function_spec(args: &mut Arguments, admin: &mut Administration) -> Result<FnOpSpec> {
    let function = args.get_required_function("fn")?;
    let function = admin.resolve(&function)?;
    expect_single_param(&function)?;
    Ok(FnOpSpec { function })
}

/// Functions applied to rows take the row as their only parameter.
pub(super) fn expect_single_param(function: &FunctionExpression) -> Result<()> {
    if function.params.len() == 1 {
        return Ok(());
    }
    let params = function.params.iter().map(|p| p.key.as_str());
    Err(Error::new_simple(format!(
        "function should have a single parameter, got [{}]",
        itertools::join(params, ", ")
    ))
    .with_code(codes::ARGUMENT))
}

fn create_window(args: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
    let every = args.get_duration("every")?;
    let period = args.get_duration("period")?;
    let round = args.get_duration("round")?.unwrap_or_default();
    let start = args.get_time("start")?.unwrap_or_default();

    let (every, period) = match (every, period) {
        (Some(every), Some(period)) => (every, period),
        (Some(d), None) | (None, Some(d)) => (d, d),
        (None, None) => (Duration::ZERO, Duration::ZERO),
    };
    Ok(OperationSpec::Window(WindowOpSpec {
        every,
        period,
        start,
        round,
    }))
}

fn create_limit(args: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
    let limit = args.get_required_int("limit")?;
    let offset = args.get_int("offset")?.unwrap_or_default();
    if limit < 0 || offset < 0 {
        return Err(Error::new_simple(format!(
            "limit and offset must not be negative, got limit {limit} and offset {offset}"
        ))
        .with_code(codes::ARGUMENT));
    }
    Ok(OperationSpec::Limit(LimitOpSpec { limit, offset }))
}

fn create_group(args: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
    let by = string_array(args, "by")?;
    let keep = string_array(args, "keep")?;
    let except = string_array(args, "except")?;

    if by.is_some() && except.is_some() {
        return Err(Error::new_simple(
            r#"cannot specify both "by" and "except" keyword arguments"#,
        )
        .with_code(codes::ARGUMENT));
    }
    Ok(OperationSpec::Group(GroupOpSpec {
        by: by.unwrap_or_default(),
        keep: keep.unwrap_or_default(),
        except: except.unwrap_or_default(),
    }))
}

fn create_sort(args: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
    let mut spec = SortOpSpec::default();
    if let Some(cols) = string_array(args, "cols")? {
        spec.cols = cols;
    }
    if let Some(desc) = args.get_bool("desc")? {
        spec.desc = desc;
    }
    Ok(OperationSpec::Sort(spec))
}

fn create_sample(args: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
    let mut spec = SampleOpSpec {
        n: args.get_required_int("n")?,
        ..Default::default()
    };
    if spec.n <= 0 {
        return Err(
            Error::new_simple(format!("sample size must be positive, got {}", spec.n))
                .with_code(codes::ARGUMENT),
        );
    }
    if let Some(pos) = args.get_int("pos")? {
        if pos >= spec.n {
            return Err(Error::new_simple(format!(
                "sample position {pos} must be less than the sample size {}",
                spec.n
            ))
            .with_code(codes::ARGUMENT));
        }
        spec.pos = pos;
    }
    if let Some(use_row_time) = args.get_bool("useRowTime")? {
        spec.use_row_time = use_row_time;
    }
    Ok(OperationSpec::Sample(spec))
}

pub(super) fn string_array(args: &mut Arguments, name: &str) -> Result<Option<Vec<String>>> {
    Ok(args
        .get_array(name, Kind::String)?
        .map(|array| array.as_strings()))
}
