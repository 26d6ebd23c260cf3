use chrono::DateTime;

use super::{Edge, FunctionEntry, Operation, OperationId, QuerySpec};
use crate::interpreter::{resolve_function, Arguments, Function, Scopes, Value};
use crate::semantic::FunctionExpression;
use crate::time::Time;
use crate::utils::NameGenerator;
use crate::{Error, Result};

/// Collects the operations and edges of one query while it is evaluated.
#[derive(Debug, Default)]
pub struct Domain {
    names: NameGenerator,
    operations: Vec<Operation>,
    edges: Vec<Edge>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls a built-in function: mints the id of the new operation, lets the
    /// function build its spec and adds the operation with its parent edges.
    pub(crate) fn call(
        &mut self,
        function: &FunctionEntry,
        parent: Option<&OperationId>,
        args: &mut Arguments,
        scopes: &Scopes,
    ) -> Result<OperationId> {
        let id = OperationId::new(self.names.gen(function.name));

        let mut admin = Administration {
            id: id.clone(),
            parents: Vec::new(),
            scopes,
        };
        if let Some(parent) = parent {
            admin.add_parent(parent.clone());
        }

        let spec = (function.create)(args, &mut admin)?;
        log::debug!("added operation {id}");

        let parents = admin.parents;
        self.operations.push(Operation {
            id: id.clone(),
            spec,
        });
        self.add_parent_edges(&id, parents);
        Ok(id)
    }

    fn add_parent_edges(&mut self, id: &OperationId, mut parents: Vec<OperationId>) {
        if parents.len() > 1 {
            parents.sort();
        }
        for parent in parents {
            if &parent == id {
                continue;
            }
            log::debug!("added edge {parent} -> {id}");
            self.edges.push(Edge {
                parent,
                child: id.clone(),
            });
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_spec(self) -> QuerySpec {
        QuerySpec {
            operations: self.operations,
            edges: self.edges,
        }
    }
}

/// What a built-in function can do to the operation being created, besides
/// returning its spec.
pub struct Administration<'a> {
    id: OperationId,
    parents: Vec<OperationId>,
    scopes: &'a Scopes,
}

impl Administration<'_> {
    /// The id of the operation being created.
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    /// Declares that the operation reads from `id`. Adding the same parent
    /// twice has no effect.
    pub fn add_parent(&mut self, id: OperationId) {
        if !self.parents.contains(&id) {
            self.parents.push(id);
        }
    }

    /// Replaces the free identifiers of a function with the values they are
    /// bound to, so the function can be shipped without its scope.
    pub fn resolve(&self, function: &Function) -> Result<FunctionExpression> {
        resolve_function(function, self.scopes)
    }
}

/// Reads a bound of a time range: a duration is relative to now, a time is
/// absolute and an integer counts seconds since the unix epoch.
pub fn to_query_time(value: &Value) -> Result<Time> {
    match value {
        Value::Time(t) => Ok(Time::Absolute(*t)),
        Value::Duration(d) => Ok(Time::Relative(*d)),
        Value::Int(secs) => DateTime::from_timestamp(*secs, 0)
            .map(Time::Absolute)
            .ok_or_else(|| Error::new_simple(format!("unix time {secs} is out of range"))),
        _ => Err(Error::new_simple(format!(
            "value is not a time, got {}",
            value.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::functions::AggregateKind;
    use crate::query::OperationSpec;
    use crate::time::Duration;

    fn create_join(_: &mut Arguments, admin: &mut Administration) -> Result<OperationSpec> {
        admin.add_parent("range1".into());
        admin.add_parent("from0".into());
        admin.add_parent("range1".into());
        Ok(OperationSpec::Aggregate(AggregateKind::Count))
    }

    fn create_failing(_: &mut Arguments, _: &mut Administration) -> Result<OperationSpec> {
        Err(Error::new_simple("boom"))
    }

    #[test]
    fn test_parent_edges_sorted_and_deduplicated() {
        let scopes = Scopes::new();
        let mut domain = Domain::new();
        let entry = FunctionEntry {
            name: "join",
            chainable: false,
            create: create_join,
        };

        let id = domain
            .call(&entry, None, &mut Arguments::default(), &scopes)
            .unwrap();
        assert_eq!(id.as_str(), "join0");

        let spec = domain.into_spec();
        let edges: Vec<_> = spec
            .edges
            .iter()
            .map(|e| format!("{} -> {}", e.parent, e.child))
            .collect();
        assert_eq!(edges, vec!["from0 -> join0", "range1 -> join0"]);
    }

    #[test]
    fn test_failed_call_adds_nothing() {
        let scopes = Scopes::new();
        let mut domain = Domain::new();
        let entry = FunctionEntry {
            name: "count",
            chainable: true,
            create: create_failing,
        };
        let parent = OperationId::from("from0");
        let result = domain.call(&entry, Some(&parent), &mut Arguments::default(), &scopes);
        assert!(result.is_err());

        let spec = domain.into_spec();
        assert!(spec.operations.is_empty());
        assert!(spec.edges.is_empty());
    }

    #[test]
    fn test_to_query_time() {
        let hours = Duration::from_hours(-4);
        assert_eq!(
            to_query_time(&Value::Duration(hours)).unwrap(),
            Time::Relative(hours)
        );
        assert_eq!(
            to_query_time(&Value::Int(1_483_228_800)).unwrap(),
            Time::Absolute(Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            to_query_time(&Value::String("now".to_string()))
                .unwrap_err()
                .to_string(),
            "value is not a time, got string"
        );
    }
}
