use serde::{Deserialize, Serialize};

use super::{FROM, SELECT};
use crate::interpreter::Arguments;
use crate::query::{Administration, OperationSpec, Registry};
use crate::semantic::Kind;
use crate::Result;

/// Reads a database. `select` and `from` take the same arguments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FromOpSpec {
    pub database: String,
    /// Storage nodes to read from; all of them when empty.
    pub hosts: Vec<String>,
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry.register_function(SELECT, |args, admin| {
        source_spec(args, admin).map(OperationSpec::Select)
    })?;
    registry.register_kind(SELECT, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::Select)
    })?;

    registry.register_function(FROM, |args, admin| {
        source_spec(args, admin).map(OperationSpec::From)
    })?;
    registry.register_kind(FROM, |_, spec| {
        serde_json::from_value(spec).map(OperationSpec::From)
    })?;
    Ok(())
}

fn source_spec(args: &mut Arguments, _: &mut Administration) -> Result<FromOpSpec> {
    let database = args.get_required_string("db")?;
    let hosts = args
        .get_array("hosts", Kind::String)?
        .map(|hosts| hosts.as_strings())
        .unwrap_or_default();
    Ok(FromOpSpec { database, hosts })
}
