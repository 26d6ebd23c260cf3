use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::OnceLock;

use super::{Administration, OperationSpec};
use crate::interpreter::Arguments;
use crate::{Error, Result};

/// Builds the spec of a new operation from the keyword arguments of a call.
pub type CreateFn = fn(&mut Arguments, &mut Administration) -> Result<OperationSpec>;

/// Decodes the JSON spec of an operation of the given kind.
pub type DecodeFn = fn(&str, serde_json::Value) -> Result<OperationSpec, serde_json::Error>;

/// A built-in function that adds an operation to the query.
#[derive(Clone, Copy)]
pub struct FunctionEntry {
    pub name: &'static str,
    /// Chainable functions are methods of tables: the table they are called
    /// on becomes the parent of the new operation.
    pub chainable: bool,
    pub create: CreateFn,
}

impl Debug for FunctionEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("chainable", &self.chainable)
            .finish_non_exhaustive()
    }
}

/// Everything known about operation kinds: the functions that create them
/// and the decoders that read them back from JSON.
#[derive(Debug, Default)]
pub struct Registry {
    functions: HashMap<&'static str, FunctionEntry>,
    decoders: HashMap<&'static str, DecodeFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a free function, available in the root scope.
    pub fn register_function(&mut self, name: &'static str, create: CreateFn) -> Result<()> {
        self.insert_function(name, create, false)
    }

    /// Registers a method of tables.
    pub fn register_method(&mut self, name: &'static str, create: CreateFn) -> Result<()> {
        self.insert_function(name, create, true)
    }

    fn insert_function(&mut self, name: &'static str, create: CreateFn, chainable: bool) -> Result<()> {
        if self.functions.contains_key(name) {
            return Err(Error::new_assert(format!(
                "duplicate registration for function {name:?}"
            )));
        }
        let entry = FunctionEntry {
            name,
            chainable,
            create,
        };
        self.functions.insert(name, entry);
        Ok(())
    }

    pub fn register_kind(&mut self, kind: &'static str, decode: DecodeFn) -> Result<()> {
        if self.decoders.contains_key(kind) {
            return Err(Error::new_assert(format!(
                "duplicate registration for operation kind {kind}"
            )));
        }
        self.decoders.insert(kind, decode);
        Ok(())
    }

    /// Free functions, sorted by name.
    pub fn functions(&self) -> Vec<&FunctionEntry> {
        let mut functions: Vec<_> = self.functions.values().filter(|f| !f.chainable).collect();
        functions.sort_by_key(|f| f.name);
        functions
    }

    /// The table method with this name.
    pub fn method(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name).filter(|f| f.chainable)
    }

    pub fn decode(&self, kind: &str, spec: serde_json::Value) -> Result<OperationSpec, String> {
        let decode = self
            .decoders
            .get(kind)
            .ok_or_else(|| format!("unknown operation spec kind {kind}"))?;

        // a missing spec means all fields take their defaults
        let spec = match spec {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            spec => spec,
        };
        decode(kind, spec).map_err(|e| e.to_string())
    }
}

/// The registry of all built-in functions and operation kinds.
///
/// Built on first use and immutable afterwards.
pub fn registry() -> Result<&'static Registry> {
    static REGISTRY: OnceLock<Result<Registry>> = OnceLock::new();

    REGISTRY
        .get_or_init(|| {
            let mut registry = Registry::new();
            crate::functions::register(&mut registry)?;
            log::debug!(
                "registered {} functions and {} operation kinds",
                registry.functions.len(),
                registry.decoders.len()
            );
            Ok(registry)
        })
        .as_ref()
        .map_err(Clone::clone)
}
