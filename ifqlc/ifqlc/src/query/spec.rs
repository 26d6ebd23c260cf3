use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::functions::*;

/// The kind-specific part of an operation.
///
/// Serializes as the bare spec object; the kind travels next to it in
/// [super::Operation].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSpec {
    Select(FromOpSpec),
    From(FromOpSpec),
    Range(RangeOpSpec),
    Where(WhereOpSpec),
    Filter(FnOpSpec),
    Map(FnOpSpec),
    Window(WindowOpSpec),
    Limit(LimitOpSpec),
    Group(GroupOpSpec),
    Sort(SortOpSpec),
    Sample(SampleOpSpec),
    Selector(SelectorKind, SelectorOpSpec),
    /// Aggregates carry no arguments.
    Aggregate(AggregateKind),
    Join(JoinOpSpec),
}

impl OperationSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            OperationSpec::Select(_) => SELECT,
            OperationSpec::From(_) => FROM,
            OperationSpec::Range(_) => RANGE,
            OperationSpec::Where(_) => WHERE,
            OperationSpec::Filter(_) => FILTER,
            OperationSpec::Map(_) => MAP,
            OperationSpec::Window(_) => WINDOW,
            OperationSpec::Limit(_) => LIMIT,
            OperationSpec::Group(_) => GROUP,
            OperationSpec::Sort(_) => SORT,
            OperationSpec::Sample(_) => SAMPLE,
            OperationSpec::Selector(kind, _) => kind.into(),
            OperationSpec::Aggregate(kind) => kind.into(),
            OperationSpec::Join(_) => JOIN,
        }
    }
}

impl Serialize for OperationSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OperationSpec::Select(spec) | OperationSpec::From(spec) => spec.serialize(serializer),
            OperationSpec::Range(spec) => spec.serialize(serializer),
            OperationSpec::Where(spec) => spec.serialize(serializer),
            OperationSpec::Filter(spec) | OperationSpec::Map(spec) => spec.serialize(serializer),
            OperationSpec::Window(spec) => spec.serialize(serializer),
            OperationSpec::Limit(spec) => spec.serialize(serializer),
            OperationSpec::Group(spec) => spec.serialize(serializer),
            OperationSpec::Sort(spec) => spec.serialize(serializer),
            OperationSpec::Sample(spec) => spec.serialize(serializer),
            OperationSpec::Selector(_, spec) => spec.serialize(serializer),
            OperationSpec::Aggregate(_) => serializer.serialize_map(Some(0))?.end(),
            OperationSpec::Join(spec) => spec.serialize(serializer),
        }
    }
}
