use std::collections::HashSet;
use std::fmt;

use docstore_path::Path;
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::change::{codec, Change, ContainerKind};
use crate::dict::ObservableDict;
use crate::error::ModelError;
use crate::find::Find;
use crate::list::{parse_index_key, ObservableList};
use crate::listeners::{ChangeListeners, ListenerId, Phase};
use crate::node::{Key, Node, WeakContainer};
use crate::source::AssignSource;
use crate::value::Value;

/// Either kind of container, for code that walks a tree without caring
/// which one it holds.
///
/// Equality is identity.
#[derive(Clone)]
pub enum Container {
    Dict(ObservableDict),
    List(ObservableList),
}

impl Container {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Dict(_) => ContainerKind::Dict,
            Container::List(_) => ContainerKind::List,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Container::Dict(dict) => dict.len(),
            Container::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> JsonValue {
        match self {
            Container::Dict(dict) => dict.snapshot(),
            Container::List(list) => list.snapshot(),
        }
    }

    pub fn ptr_eq(&self, other: &Container) -> bool {
        self.addr() == other.addr()
    }

    pub fn as_dict(&self) -> Option<&ObservableDict> {
        match self {
            Container::Dict(dict) => Some(dict),
            Container::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            Container::List(list) => Some(list),
            Container::Dict(_) => None,
        }
    }

    pub(crate) fn addr(&self) -> *const () {
        match self {
            Container::Dict(dict) => dict.addr(),
            Container::List(list) => list.addr(),
        }
    }

    pub(crate) fn node(&self) -> &Node {
        match self {
            Container::Dict(dict) => dict.node(),
            Container::List(list) => list.node(),
        }
    }

    pub(crate) fn weak(&self) -> WeakContainer {
        match self {
            Container::Dict(dict) => dict.weak(),
            Container::List(list) => list.weak(),
        }
    }

    /// Direct children, dict entries in key order or list items in order.
    pub fn values(&self) -> Vec<Value> {
        match self {
            Container::Dict(dict) => dict.values(),
            Container::List(list) => list.values(),
        }
    }

    pub fn entries(&self) -> Vec<(Key, Value)> {
        match self {
            Container::Dict(dict) => dict
                .entries()
                .into_iter()
                .map(|(key, value)| (Key::Name(key), value))
                .collect(),
            Container::List(list) => list
                .values()
                .into_iter()
                .enumerate()
                .map(|(index, value)| (Key::Index(index), value))
                .collect(),
        }
    }

    // ── Keyed access ──────────────────────────────────────────────────────

    /// Looks up a child by its string key. Never fails: list keys that are
    /// not integers simply find nothing.
    pub fn get_key(&self, key: &str) -> Option<Value> {
        match self {
            Container::Dict(dict) => dict.get(key),
            Container::List(list) => list.get(parse_index_key(key).ok()?),
        }
    }

    pub fn set_key(&self, key: &str, value: impl Into<Value>) -> Result<Option<Change>, ModelError> {
        match self {
            Container::Dict(dict) => dict.set(key, value),
            Container::List(list) => list.set(parse_index_key(key)?, value),
        }
    }

    pub fn delete_key(&self, key: &str) -> Result<Option<Change>, ModelError> {
        match self {
            Container::Dict(dict) => Ok(dict.delete(key)),
            Container::List(list) => list.delete(parse_index_key(key)?).map(Some),
        }
    }

    /// Walks nested containers along `path`.
    pub fn get_in(&self, path: impl Into<Path>) -> Option<Value> {
        let path: Path = path.into();
        let mut current = Value::from(self.clone());
        for step in &path {
            current = current.as_container()?.get_key(step)?;
        }
        Some(current)
    }

    // ── Diff and replay ───────────────────────────────────────────────────

    pub fn assign<'a>(&self, source: impl Into<AssignSource<'a>>) -> Result<Vec<Change>, ModelError> {
        match self {
            Container::Dict(dict) => dict.assign(source),
            Container::List(list) => list.assign(source),
        }
    }

    pub fn apply(&self, change: &Change) -> Result<Option<Change>, ModelError> {
        match self {
            Container::Dict(dict) => dict.apply(change),
            Container::List(list) => list.apply(change),
        }
    }

    /// Decodes a change received as JSON and applies it. Malformed input is
    /// reported as a value error, like any other unusable change.
    pub fn apply_json(&self, wire: &JsonValue) -> Result<Option<Change>, ModelError> {
        let change = codec::from_json(wire).map_err(|e| ModelError::Value(e.to_string()))?;
        self.apply(&change)
    }

    // ── Observation ───────────────────────────────────────────────────────

    pub fn before_change_callbacks(&self) -> &ChangeListeners {
        self.node().listeners(Phase::Before)
    }

    pub fn after_change_callbacks(&self) -> &ChangeListeners {
        self.node().listeners(Phase::After)
    }

    /// Registers a listener that only hears about `path`, with changes
    /// re-expressed relative to it.
    pub fn subscribe_at<F>(&self, path: impl Into<Path>, phase: Phase, listener: F) -> ListenerId
    where
        F: Fn(&Change) + 'static,
    {
        let path = path.into();
        self.node().listeners(phase).add(move |change| {
            if let Some(sub) = change.sub_change(&path) {
                listener(&sub);
            }
        })
    }

    /// Every container currently holding this one, with the key it is held
    /// under.
    pub fn parents(&self) -> Vec<(Container, Key)> {
        self.node().parents()
    }

    /// True when `other` holds this container, directly or transitively.
    pub fn has_ancestor(&self, other: &Container) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<Container> = self.parents().into_iter().map(|(c, _)| c).collect();
        while let Some(current) = stack.pop() {
            if current.ptr_eq(other) {
                return true;
            }
            if visited.insert(current.addr()) {
                stack.extend(current.parents().into_iter().map(|(c, _)| c));
            }
        }
        false
    }

    /// Lazy depth-first search over every value below this container.
    pub fn find<P>(&self, predicate: P) -> Find<P>
    where
        P: FnMut(&Value) -> bool,
    {
        Find::new(self.values(), predicate)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Rejects values that would make this container its own descendant.
    pub(crate) fn validate_value(&self, value: &Value) -> Result<(), ModelError> {
        match value.as_container() {
            Some(candidate) => self.validate_candidate(&candidate),
            None => Ok(()),
        }
    }

    /// Same check over every container an `assign` source could attach.
    pub(crate) fn validate_source(&self, source: &AssignSource<'_>) -> Result<(), ModelError> {
        for candidate in source.containers() {
            self.validate_candidate(&candidate)?;
        }
        Ok(())
    }

    /// Runs the cycle check `assign` would run at every level it recurses
    /// into, so a rejected source leaves the tree untouched.
    pub(crate) fn validate_assign(&self, source: &AssignSource<'_>) -> Result<(), ModelError> {
        if source.as_container().is_some_and(|other| other.ptr_eq(self)) {
            return Ok(());
        }
        self.validate_source(source)?;
        let pairs: Vec<(String, AssignSource<'_>)> = match self {
            Container::Dict(_) => source.dict_entries().unwrap_or_default(),
            Container::List(_) => source
                .list_items()
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(at, item)| (at.to_string(), item))
                .collect(),
        };
        for (key, new) in pairs {
            let child = self
                .get_key(&key)
                .and_then(|old| old.as_container())
                .filter(|old| Some(old.kind()) == new.kind());
            if let Some(child) = child {
                child.validate_assign(&new)?;
            }
        }
        Ok(())
    }

    fn validate_candidate(&self, candidate: &Container) -> Result<(), ModelError> {
        if candidate.ptr_eq(self) || self.has_ancestor(candidate) {
            return Err(ModelError::CyclicReference);
        }
        Ok(())
    }

    /// Notifies this container's listeners, then every ancestor's, with the
    /// change re-wrapped in the key of each hop.
    pub(crate) fn dispatch(&self, phase: Phase, change: &Change) {
        let node = self.node();
        trace!(?phase, path = %change.path(), kind = self.kind().as_str(), "dispatch");
        node.listeners(phase).emit(change);
        for (owner, key) in node.parents() {
            owner.dispatch(phase, &change.clone().wrap(key.to_string()));
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Dict(dict) => fmt::Debug::fmt(dict, f),
            Container::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

impl From<ObservableDict> for Container {
    fn from(dict: ObservableDict) -> Self {
        Container::Dict(dict)
    }
}

impl From<ObservableList> for Container {
    fn from(list: ObservableList) -> Self {
        Container::List(list)
    }
}
