use std::collections::{HashMap, HashSet};

use super::Value;

/// Index of a scope record in [Scopes].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct ScopeRecord {
    parent: Option<ScopeId>,
    values: HashMap<String, Value>,
    /// Set by a `return` statement of a block evaluated in this scope.
    return_value: Option<Value>,
    /// Allocation order. Zero for the root and for freed records.
    created: u64,
}

/// All scopes of one evaluation, in an arena. Each record points at its
/// enclosing record; the chain ends at [Scopes::ROOT], which holds the
/// built-in functions.
///
/// Records freed by [Scopes::release] are handed out again, so the arena
/// only holds the scopes that values still capture.
#[derive(Debug)]
pub struct Scopes {
    records: Vec<ScopeRecord>,
    free: Vec<ScopeId>,
    allocated: u64,
}

impl Scopes {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn new() -> Self {
        Scopes {
            records: vec![ScopeRecord::default()],
            free: Vec::new(),
            allocated: 0,
        }
    }

    /// A new empty scope enclosed by `parent`.
    pub fn nest(&mut self, parent: ScopeId) -> ScopeId {
        self.alloc(parent, HashMap::new())
    }

    fn alloc(&mut self, parent: ScopeId, values: HashMap<String, Value>) -> ScopeId {
        self.allocated += 1;
        let record = ScopeRecord {
            parent: Some(parent),
            values,
            return_value: None,
            created: self.allocated,
        };

        match self.free.pop() {
            Some(id) => {
                self.records[id.0] = record;
                id
            }
            None => {
                self.records.push(record);
                ScopeId(self.records.len() - 1)
            }
        }
    }

    /// Frees the scope of a finished call, together with every record
    /// allocated after it that `result` doesn't capture.
    ///
    /// Records made during a call are reachable only through the value the
    /// call returns, because functions capture snapshots and never the call
    /// scope itself.
    pub fn release(&mut self, scope: ScopeId, result: Option<&Value>) {
        if scope == Self::ROOT {
            return;
        }
        let since = self.records[scope.0].created;

        let mut captured = Vec::new();
        if let Some(result) = result {
            result.captured_scopes(&mut captured);
        }
        let kept = self.mark(captured, since);
        self.sweep(&kept, since);
    }

    /// Frees every record that `roots` don't reach through parents or
    /// through the functions bound in them. The root is always kept.
    pub fn collect(&mut self, roots: Vec<ScopeId>) {
        let kept = self.mark(roots, 1);
        self.sweep(&kept, 1);
    }

    /// Records allocated at or after `since` that are reachable from `pending`.
    fn mark(&self, mut pending: Vec<ScopeId>, since: u64) -> HashSet<ScopeId> {
        let mut kept = HashSet::new();
        while let Some(id) = pending.pop() {
            let record = &self.records[id.0];
            if record.created < since || !kept.insert(id) {
                continue;
            }
            for value in record.values.values() {
                value.captured_scopes(&mut pending);
            }
            pending.extend(record.parent);
        }
        kept
    }

    fn sweep(&mut self, kept: &HashSet<ScopeId>, since: u64) {
        let before = self.free.len();
        for (index, record) in self.records.iter_mut().enumerate() {
            let id = ScopeId(index);
            if record.created >= since && !kept.contains(&id) {
                *record = ScopeRecord::default();
                self.free.push(id);
            }
        }
        log::trace!("freed {} scopes", self.free.len() - before);
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let record = &self.records[id.0];
            if let Some(value) = record.values.get(name) {
                return Some(value);
            }
            current = record.parent;
        }
        None
    }

    pub fn set(&mut self, scope: ScopeId, name: String, value: Value) {
        self.records[scope.0].values.insert(name, value);
    }

    /// Names bound directly in this scope, without its parents.
    pub fn values(&self, scope: ScopeId) -> &HashMap<String, Value> {
        &self.records[scope.0].values
    }

    pub fn set_return(&mut self, scope: ScopeId, value: Value) {
        self.records[scope.0].return_value = Some(value);
    }

    /// The value of the `return` statement evaluated in this scope, if any.
    /// Can be taken only once.
    pub fn take_return(&mut self, scope: ScopeId) -> Option<Value> {
        self.records[scope.0].return_value.take()
    }

    /// Copies every binding visible from `scope`, except the built-ins, into
    /// a new scope directly under the root.
    ///
    /// Functions capture a snapshot, so later assignments in the defining
    /// scope don't change them and the scopes of finished calls can be freed.
    pub fn snapshot(&mut self, scope: ScopeId) -> ScopeId {
        if scope == Self::ROOT {
            return Self::ROOT;
        }

        let mut values = HashMap::new();
        let mut current = Some(scope);
        while let Some(id) = current.filter(|id| *id != Self::ROOT) {
            let record = &self.records[id.0];
            for (name, value) in &record.values {
                values
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            current = record.parent;
        }

        self.alloc(Self::ROOT, values)
    }

    /// Number of records in use, the root included.
    #[cfg(test)]
    pub(crate) fn live_records(&self) -> usize {
        self.records.len() - self.free.len()
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
