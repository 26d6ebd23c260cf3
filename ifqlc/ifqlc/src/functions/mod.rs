//! The built-in functions: each one adds an operation of its kind to the
//! query.
//!
//! `select`, `from` and `join` start pipelines; every other function is a
//! method of tables and takes the table it is called on as its parent.

mod aggregate;
mod join;
mod source;
mod transform;

pub use aggregate::{AggregateKind, SelectorKind, SelectorOpSpec};
pub use join::JoinOpSpec;
pub use source::FromOpSpec;
pub use transform::{
    FnOpSpec, GroupOpSpec, LimitOpSpec, RangeOpSpec, SampleOpSpec, SortOpSpec, WhereOpSpec,
    WindowOpSpec,
};

use crate::query::Registry;
use crate::Result;

pub const SELECT: &str = "select";
pub const FROM: &str = "from";
pub const RANGE: &str = "range";
pub const WHERE: &str = "where";
pub const FILTER: &str = "filter";
pub const MAP: &str = "map";
pub const WINDOW: &str = "window";
pub const LIMIT: &str = "limit";
pub const GROUP: &str = "group";
pub const SORT: &str = "sort";
pub const SAMPLE: &str = "sample";
pub const JOIN: &str = "join";

/// Column sorted on when `sort` isn't given any.
pub const DEFAULT_SORT_COLUMN: &str = "_value";

/// Registers every built-in function and operation kind.
pub fn register(registry: &mut Registry) -> Result<()> {
    source::register(registry)?;
    transform::register(registry)?;
    aggregate::register(registry)?;
    join::register(registry)?;
    Ok(())
}
