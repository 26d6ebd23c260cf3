use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{compile, CompiledFn, ReferencePath, Type};
use crate::semantic::FunctionExpression;
use crate::{Error, Result};

/// Compiles one function for each distinct set of reference types it is
/// called with, and keeps the results.
///
/// Results live in a trie that branches on the type of each reference path,
/// in sorted path order. Failed compilations are cached as well.
#[derive(Debug)]
pub struct CompilationCache {
    function: FunctionExpression,
    paths: Vec<ReferencePath>,
    root: Mutex<CacheNode>,
}

#[derive(Debug, Default)]
struct CacheNode {
    children: HashMap<Type, CacheNode>,
    compiled: Option<Result<Arc<CompiledFn>>>,
}

impl CompilationCache {
    pub fn new(function: FunctionExpression, mut paths: Vec<ReferencePath>) -> Self {
        paths.sort();
        paths.dedup();
        CompilationCache {
            function,
            paths,
            root: Mutex::new(CacheNode::default()),
        }
    }

    pub fn compile(&self, types: &HashMap<ReferencePath, Type>) -> Result<Arc<CompiledFn>> {
        // held for the whole compilation, so each signature is compiled once
        let mut root = self
            .root
            .lock()
            .map_err(|_| Error::new_assert("compilation cache is poisoned"))?;

        let mut node = &mut *root;
        for path in &self.paths {
            let kind = types.get(path).copied().unwrap_or_default();
            node = node.children.entry(kind).or_default();
        }

        node.compiled
            .get_or_insert_with(|| {
                log::debug!("compiling function for {} reference types", self.paths.len());
                compile(&self.function, types).map(Arc::new)
            })
            .clone()
    }
}
