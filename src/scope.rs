//! Scope stack shared by the reader and writer.
//!
//! Every state-changing call on a tokenizer is phrased against the top of
//! this stack: expect one of a set of scopes, then mutate the top and/or
//! push or pop. The stack is three parallel arrays (scopes, path names,
//! path indices) so that rendering the JsonPath never chases pointers.

use crate::error::{JsonError, JsonErrorKind, Result};

/// Lexical scoping state of a stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// No top-level value has been emitted or consumed yet
    EmptyDocument,
    /// A top-level value has been emitted or consumed
    NonemptyDocument,
    /// Inside `[` with no element yet
    EmptyArray,
    /// Inside `[` with at least one element
    NonemptyArray,
    /// Inside `{` with no name/value pair yet
    EmptyObject,
    /// Inside `{` with at least one name/value pair
    NonemptyObject,
    /// A name has been consumed or emitted; its value is pending
    DanglingName,
    /// A raw value sink is open on the writer
    StreamingValue,
    /// The reader or writer has been closed
    Closed,
}

/// Deepest document nesting either tokenizer accepts.
pub const MAX_DEPTH: usize = 256;

const INITIAL_CAPACITY: usize = 32;

/// Parallel-array stack of scopes, path names, and path indices.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    names: Vec<Option<String>>,
    indices: Vec<usize>,
}

impl ScopeStack {
    /// A stack holding the single given scope.
    pub fn with_root(root: Scope) -> Self {
        let mut stack = ScopeStack {
            scopes: Vec::with_capacity(INITIAL_CAPACITY),
            names: Vec::with_capacity(INITIAL_CAPACITY),
            indices: Vec::with_capacity(INITIAL_CAPACITY),
        };
        stack.scopes.push(root);
        stack.names.push(None);
        stack.indices.push(0);
        stack
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// True when every frame has been popped.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// The top scope. Fails once the stack has been emptied by `close`.
    pub fn peek(&self) -> Result<Scope> {
        self.scopes
            .last()
            .copied()
            .ok_or_else(|| JsonError::invalid_state("tokenizer is closed"))
    }

    /// Push a new frame, failing with a nesting error past [`MAX_DEPTH`].
    pub fn push(&mut self, scope: Scope) -> Result<()> {
        if self.scopes.len() >= MAX_DEPTH {
            return Err(JsonError::new(JsonErrorKind::TooDeeplyNested).with_path(self.path()));
        }
        self.scopes.push(scope);
        self.names.push(None);
        self.indices.push(0);
        Ok(())
    }

    /// Pop the top frame.
    pub fn pop(&mut self) {
        self.scopes.pop();
        self.names.pop();
        self.indices.pop();
    }

    /// Replace the top scope in place.
    pub fn replace_top(&mut self, scope: Scope) {
        if let Some(top) = self.scopes.last_mut() {
            *top = scope;
        }
    }

    /// Record the most recent property name for the top frame.
    pub fn set_top_name(&mut self, name: Option<String>) {
        if let Some(slot) = self.names.last_mut() {
            *slot = name;
        }
    }

    /// The most recent property name of the top frame.
    pub fn top_name(&self) -> Option<&str> {
        self.names.last().and_then(|n| n.as_deref())
    }

    /// Increment the element index of the top frame.
    pub fn bump_top_index(&mut self) {
        if let Some(index) = self.indices.last_mut() {
            *index += 1;
        }
    }

    /// Decrement the element index of the top frame (used when a consumed
    /// name is handed back).
    pub fn drop_top_index(&mut self) {
        if let Some(index) = self.indices.last_mut() {
            *index = index.saturating_sub(1);
        }
    }

    /// Number of frames holding an open array or object (a dangling name
    /// counts: it replaced its object's scope).
    pub fn open_containers(&self) -> usize {
        self.scopes
            .iter()
            .filter(|scope| {
                matches!(
                    scope,
                    Scope::EmptyArray
                        | Scope::NonemptyArray
                        | Scope::EmptyObject
                        | Scope::NonemptyObject
                        | Scope::DanglingName
                )
            })
            .count()
    }

    /// Render the JsonPath for the current stack.
    pub fn path(&self) -> String {
        path(&self.scopes, &self.names, &self.indices)
    }
}

/// Render a JsonPath string from parallel scope arrays: `$`, then `.name`
/// for object frames with a recorded name and `[index]` for array frames.
pub fn path(scopes: &[Scope], names: &[Option<String>], indices: &[usize]) -> String {
    let mut out = String::from("$");
    for (i, scope) in scopes.iter().enumerate() {
        match scope {
            Scope::EmptyArray | Scope::NonemptyArray => {
                out.push('[');
                out.push_str(itoa::Buffer::new().format(indices[i]));
                out.push(']');
            }
            Scope::EmptyObject | Scope::NonemptyObject | Scope::DanglingName => {
                if let Some(name) = &names[i] {
                    out.push('.');
                    out.push_str(name);
                }
            }
            Scope::EmptyDocument
            | Scope::NonemptyDocument
            | Scope::StreamingValue
            | Scope::Closed => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_names_and_indices() {
        let mut stack = ScopeStack::with_root(Scope::NonemptyDocument);
        stack.push(Scope::NonemptyObject).unwrap();
        stack.set_top_name(Some("users".into()));
        stack.push(Scope::NonemptyArray).unwrap();
        stack.bump_top_index();
        stack.bump_top_index();
        stack.push(Scope::EmptyObject).unwrap();
        stack.set_top_name(Some("id".into()));
        assert_eq!(stack.path(), "$.users[2].id");
    }

    #[test]
    fn push_past_cap_is_a_nesting_error() {
        let mut stack = ScopeStack::with_root(Scope::EmptyDocument);
        for _ in 0..MAX_DEPTH - 1 {
            stack.push(Scope::EmptyArray).unwrap();
        }
        let err = stack.push(Scope::EmptyArray).unwrap_err();
        assert!(matches!(err.kind, JsonErrorKind::TooDeeplyNested));
    }
}
