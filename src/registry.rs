//! Action registry: the name → capability table the engine dispatches against.
//!
//! The registry is built once from an action library and passed to the
//! engine explicitly. Nothing is ever looked up in global state.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::ast::Arg;
use crate::error::UnknownActionError;

/// A callable capability.
///
/// Arity and argument types are the action's own business: a mismatch is an
/// ordinary invocation error.
#[async_trait]
pub trait Action: Send + Sync {
    /// Invoke the action with its parsed arguments.
    async fn invoke(&self, args: Vec<Arg>) -> anyhow::Result<Json>;
}

/// An action backed by an async closure.
pub struct FnAction<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(Vec<Arg>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Json>> + Send,
{
    async fn invoke(&self, args: Vec<Arg>) -> anyhow::Result<Json> {
        (self.f)(args).await
    }
}

/// Wrap an async closure as an action.
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn Action>
where
    F: Fn(Vec<Arg>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Json>> + Send + 'static,
{
    Arc::new(FnAction { f })
}

/// One export of an action library.
#[derive(Clone)]
pub enum LibraryEntry {
    Action(Arc<dyn Action>),
    /// A plain value. Not callable; it can still be referenced by name from
    /// script arguments.
    Value(Json),
}

impl fmt::Debug for LibraryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryEntry::Action(_) => write!(f, "Action(..)"),
            LibraryEntry::Value(v) => write!(f, "Value({})", v),
        }
    }
}

/// Everything an action library exports, by name.
#[derive(Debug, Clone, Default)]
pub struct Library {
    entries: HashMap<String, LibraryEntry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export an action under `name`, replacing any previous export.
    pub fn action(mut self, name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.entries
            .insert(name.into(), LibraryEntry::Action(action));
        self
    }

    /// Export a plain value under `name`.
    pub fn value(mut self, name: impl Into<String>, value: Json) -> Self {
        self.entries.insert(name.into(), LibraryEntry::Value(value));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The non-callable exports, usable as external references in scripts.
    pub fn bindings(&self) -> Bindings {
        let values = self
            .entries
            .iter()
            .filter_map(|(name, entry)| match entry {
                LibraryEntry::Value(v) => Some((name.clone(), v.clone())),
                LibraryEntry::Action(_) => None,
            })
            .collect();
        Bindings { values }
    }
}

/// Immutable name → action table.
#[derive(Clone, Default)]
pub struct Registry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl Registry {
    /// Build a registry from a library, keeping only callable exports.
    pub fn build(library: &Library) -> Self {
        let actions: HashMap<String, Arc<dyn Action>> = library
            .entries
            .iter()
            .filter_map(|(name, entry)| match entry {
                LibraryEntry::Action(action) => Some((name.clone(), Arc::clone(action))),
                LibraryEntry::Value(_) => None,
            })
            .collect();
        tracing::debug!(actions = actions.len(), "built action registry");
        Self { actions }
    }

    /// Look up an action by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>, UnknownActionError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownActionError {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("actions", &self.names())
            .finish()
    }
}

/// Named values that bare identifiers in arguments resolve to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Json>,
}

impl Bindings {
    pub fn insert(&mut self, name: impl Into<String>, value: Json) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.values.get(name)
    }

    pub fn extend(&mut self, other: Bindings) {
        self.values.extend(other.values);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
