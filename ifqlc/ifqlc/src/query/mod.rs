//! The query spec: the operations a program registered and the edges between
//! them.
//!
//! Operations are created by built-in functions while the interpreter runs
//! (see [Domain]); the finished [QuerySpec] is plain data that can be
//! validated, walked in dependency order and (de)serialized as JSON.

mod domain;
mod registry;
mod spec;

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};

use ifqlc_parser::error::codes;
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use domain::{to_query_time, Administration, Domain};
pub use registry::{registry, CreateFn, DecodeFn, FunctionEntry, Registry};
pub use spec::OperationSpec;

use crate::utils::toposort;
use crate::{Error, ErrorSource, Result, WithErrorInfo};

/// Unique name of an operation within a query, such as `range1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        OperationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(id: &str) -> Self {
        OperationId::new(id)
    }
}

/// Data flows from `parent` into `child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub parent: OperationId,
    pub child: OperationId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: OperationId,
    pub spec: OperationSpec,
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        self.spec.kind()
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Operation", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("spec", &self.spec)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawOperation {
            id: OperationId,
            kind: String,
            #[serde(default)]
            spec: serde_json::Value,
        }

        let raw = RawOperation::deserialize(deserializer)?;
        let registry = registry().map_err(D::Error::custom)?;
        let spec = registry.decode(&raw.kind, raw.spec).map_err(|e| {
            D::Error::custom(format!("failed to unmarshal operation {:?}: {e}", raw.id.0))
        })?;
        Ok(Operation { id: raw.id, spec })
    }
}

/// A complete query: operations in creation order and the edges between
/// them in the order they were declared.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    pub operations: Vec<Operation>,
    pub edges: Vec<Edge>,
}

impl QuerySpec {
    /// Checks that the operations form a DAG: unique ids, edges between
    /// known operations, at least one root and no cycles.
    ///
    /// A spec without any operations is valid.
    pub fn validate(&self) -> Result<()> {
        self.check_graph()
            .with_code_fallback(codes::GRAPH)
            .with_source(ErrorSource::Query)
    }

    fn check_graph(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for op in &self.operations {
            if !ids.insert(&op.id) {
                return Err(Error::new_simple(format!(
                    "found duplicate operation ID {:?}",
                    op.id.as_str()
                )));
            }
        }

        for edge in &self.edges {
            if !ids.contains(&edge.child) {
                return Err(Error::new_simple(format!(
                    "edge references an unknown child operation {:?}",
                    edge.child.as_str()
                )));
            }
            if !ids.contains(&edge.parent) {
                return Err(Error::new_simple(format!(
                    "edge references an unknown parent operation {:?}",
                    edge.parent.as_str()
                )));
            }
            if edge.parent == edge.child {
                return Err(Error::new_simple(format!(
                    "edge is a self-loop on {:?}",
                    edge.parent.as_str()
                )));
            }
        }

        if !self.operations.is_empty() && self.roots().is_empty() {
            return Err(Error::new_simple("query has no root nodes"));
        }

        self.order()?;
        Ok(())
    }

    /// Operations without parents.
    pub fn roots(&self) -> Vec<&Operation> {
        let children: HashSet<_> = self.edges.iter().map(|e| &e.child).collect();
        self.operations
            .iter()
            .filter(|op| !children.contains(&op.id))
            .collect()
    }

    pub fn parents(&self, id: &OperationId) -> Vec<&OperationId> {
        self.edges
            .iter()
            .filter(|e| &e.child == id)
            .map(|e| &e.parent)
            .collect()
    }

    pub fn children(&self, id: &OperationId) -> Vec<&OperationId> {
        self.edges
            .iter()
            .filter(|e| &e.parent == id)
            .map(|e| &e.child)
            .collect()
    }

    /// Calls `f` on each operation, parents before children.
    pub fn walk<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Operation) -> Result<()>,
    {
        for op in self.order()? {
            f(op)?;
        }
        Ok(())
    }

    fn order(&self) -> Result<Vec<&Operation>> {
        let by_id: HashMap<_, _> = self.operations.iter().map(|op| (&op.id, op)).collect();

        let dependencies = self
            .operations
            .iter()
            .map(|op| (&op.id, self.parents(&op.id)))
            .collect::<Vec<_>>();

        let order = toposort(&dependencies).ok_or_else(|| {
            Error::new_simple("found cycle in query")
                .with_code(codes::GRAPH)
                .with_source(ErrorSource::Query)
        })?;

        Ok(order.into_iter().filter_map(|id| by_id.get(*id).copied()).collect())
    }
}
