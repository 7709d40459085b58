use std::collections::HashMap;

use crate::value::Value;

/// Stack of scopes with the root scope at the bottom.
///
/// Lookups walk outward from the innermost scope until the name is found. A
/// call pushes its scope on top of the caller's, so a function body sees
/// every binding visible at the call site.
#[derive(Debug)]
pub struct ScopeStack {
    stack: Vec<HashMap<String, Value>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            stack: vec![HashMap::new()],
        }
    }

    pub fn nest(&mut self) {
        self.stack.push(HashMap::new());
        log::trace!("nest scope, depth {}", self.stack.len());
    }

    /// Pops the innermost scope. The root scope stays.
    pub fn unnest(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
            log::trace!("unnest scope, depth {}", self.stack.len());
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Binds `name` in the innermost scope, shadowing any outer binding.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.stack.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.stack.iter().rev().find_map(|scope| scope.get(name))
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.stack
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Overwrites the nearest binding of `name`. Returns `false` without
    /// creating anything when there is none.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
