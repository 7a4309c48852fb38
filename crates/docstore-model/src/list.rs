use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::change::{Change, ContainerKind, Op, Terminal};
use crate::container::Container;
use crate::equal::json_equal;
use crate::error::ModelError;
use crate::find::Find;
use crate::listeners::{ChangeListeners, ListenerId, Phase};
use crate::node::{Key, Node, WeakContainer};
use crate::source::AssignSource;
use crate::value::Value;
use docstore_path::Path;

pub(crate) struct ListInner {
    node: Node,
    items: RefCell<Vec<Value>>,
}

/// Parses a list key as carried by a [`Change`] or a [`Path`] step.
pub(crate) fn parse_index_key(key: &str) -> Result<isize, ModelError> {
    key.parse::<isize>()
        .map_err(|_| ModelError::InvalidIndex(key.to_string()))
}

/// An observable sequence.
///
/// Indices are signed: negative values count from the end, so `-1` is the
/// last item. Items that are containers know the position they are held at,
/// and those positions are renumbered on every insert and delete.
#[derive(Clone)]
pub struct ObservableList {
    inner: Rc<ListInner>,
}

impl ObservableList {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListInner {
                node: Node::new(),
                items: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = Self::new();
        for value in values {
            let value = value.into();
            let at = list.len();
            if let Some(child) = value.as_container() {
                child.node().add_parent(list.weak(), Key::Index(at));
            }
            list.inner.items.borrow_mut().push(value);
        }
        list
    }

    /// Builds a list from plain data, promoting nested objects and arrays.
    pub fn from_json_items(items: &[JsonValue]) -> Self {
        Self::from_values(items.iter().map(Value::from_json))
    }

    pub(crate) fn from_inner(inner: Rc<ListInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }

    pub(crate) fn node(&self) -> &Node {
        &self.inner.node
    }

    pub(crate) fn weak(&self) -> WeakContainer {
        WeakContainer::List(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &ObservableList) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn as_container(&self) -> Container {
        Container::List(self.clone())
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn get(&self, index: isize) -> Option<Value> {
        let at = self.normalize(index, 0).ok()?;
        self.inner.items.borrow().get(at).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    pub fn values(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    pub fn iter(&self) -> std::vec::IntoIter<Value> {
        self.values().into_iter()
    }

    pub fn snapshot(&self) -> JsonValue {
        JsonValue::Array(self.inner.items.borrow().iter().map(Value::snapshot).collect())
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Replaces the item at `index`, which must lie in `[0, len)` once
    /// negative indices are resolved.
    pub fn set(&self, index: isize, value: impl Into<Value>) -> Result<Option<Change>, ModelError> {
        let value = value.into();
        let at = self.normalize(index, 0)?;
        let container = self.as_container();
        container.validate_value(&value)?;

        let old = self.get_at(at, index)?;
        if old == value {
            return Ok(None);
        }
        let change = Change::terminal(
            at.to_string(),
            ContainerKind::List,
            Some(old.snapshot()),
            Some(value.snapshot()),
        );

        container.dispatch(Phase::Before, &change);
        let attached = value.as_container();
        let previous = {
            let mut items = self.inner.items.borrow_mut();
            let size = items.len();
            let slot = items
                .get_mut(at)
                .ok_or(ModelError::Range { index, size })?;
            std::mem::replace(slot, value)
        };
        if let Some(previous) = previous.as_container() {
            previous.node().remove_parent(self.addr(), &Key::Index(at));
        }
        if let Some(child) = attached {
            child.node().add_parent(self.weak(), Key::Index(at));
        }
        debug!(index = at, kind = "list", "set");
        container.dispatch(Phase::After, &change);
        Ok(Some(change))
    }

    /// Inserts before `index`; `index == len` appends.
    pub fn insert(&self, index: isize, value: impl Into<Value>) -> Result<Change, ModelError> {
        let value = value.into();
        let at = self.normalize(index, 1)?;
        let container = self.as_container();
        container.validate_value(&value)?;

        let change = Change::terminal(
            at.to_string(),
            ContainerKind::List,
            None,
            Some(value.snapshot()),
        );

        container.dispatch(Phase::Before, &change);
        // a listener may have shortened the list
        let at = at.min(self.len());
        self.shift_links(at, at, 1);
        let attached = value.as_container();
        self.inner.items.borrow_mut().insert(at, value);
        if let Some(child) = attached {
            child.node().add_parent(self.weak(), Key::Index(at));
        }
        debug!(index = at, kind = "list", "insert");
        container.dispatch(Phase::After, &change);
        Ok(change)
    }

    pub fn append(&self, value: impl Into<Value>) -> Result<Change, ModelError> {
        self.insert(self.len() as isize, value)
    }

    /// Removes the item at `index`, which must lie in `[0, len)`.
    pub fn delete(&self, index: isize) -> Result<Change, ModelError> {
        let at = self.normalize(index, 0)?;
        let old = self.get_at(at, index)?;
        let change = Change::terminal(at.to_string(), ContainerKind::List, Some(old.snapshot()), None);
        let container = self.as_container();

        container.dispatch(Phase::Before, &change);
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            if at >= items.len() {
                return Err(ModelError::Range {
                    index,
                    size: items.len(),
                });
            }
            items.remove(at)
        };
        if let Some(previous) = removed.as_container() {
            previous.node().remove_parent(self.addr(), &Key::Index(at));
        }
        self.shift_links(at, at + 1, -1);
        debug!(index = at, kind = "list", "delete");
        container.dispatch(Phase::After, &change);
        Ok(change)
    }

    pub fn remove(&self, index: isize) -> Result<Change, ModelError> {
        self.delete(index)
    }

    /// Removes the last item. Returns `None` on an empty list.
    pub fn pop(&self) -> Option<Change> {
        if self.is_empty() {
            return None;
        }
        self.delete(-1).ok()
    }

    /// Turns this list into a deep copy of `source` with the fewest changes.
    ///
    /// Surplus items are deleted from the end, overlapping positions are
    /// assigned recursively when both sides hold containers of the same
    /// kind and set otherwise, and missing items are appended.
    pub fn assign<'a>(
        &self,
        source: impl Into<AssignSource<'a>>,
    ) -> Result<Vec<Change>, ModelError> {
        let source = source.into();
        let items = source.list_items().ok_or_else(|| {
            ModelError::Type(format!("cannot assign {} to a list", source.type_name()))
        })?;
        let container = self.as_container();
        if source
            .as_container()
            .is_some_and(|other| other.ptr_eq(&container))
        {
            return Ok(Vec::new());
        }
        container.validate_assign(&source)?;

        let mut changes = Vec::new();
        while self.len() > items.len() {
            changes.push(self.delete(self.len() as isize - 1)?);
        }

        for (at, new) in items.into_iter().enumerate() {
            let index = at as isize;
            let Some(old) = self.get(index) else {
                changes.push(self.append(new.into_value())?);
                continue;
            };
            match old.as_container().filter(|old| Some(old.kind()) == new.kind()) {
                Some(child) => changes.extend(
                    child
                        .assign(new)?
                        .into_iter()
                        .map(|change| change.wrap(at.to_string())),
                ),
                None => changes.extend(self.set(index, new.into_value())?),
            }
        }
        Ok(changes)
    }

    /// Replays a change made elsewhere onto this list.
    ///
    /// A terminal op with only `ins` inserts, one with only `del` deletes,
    /// one with both replaces. Whatever `del` holds must match the current
    /// item.
    pub fn apply(&self, change: &Change) -> Result<Option<Change>, ModelError> {
        let key = change.key();
        let index = parse_index_key(key)?;
        let Terminal { kind, del, ins } = match change.op() {
            Op::Nested(inner) => {
                let child = self
                    .get(index)
                    .and_then(|value| value.as_container())
                    .ok_or_else(|| {
                        ModelError::Value(format!("no container at index {index} to apply to"))
                    })?;
                return Ok(child.apply(inner)?.map(|applied| applied.wrap(key)));
            }
            Op::Terminal(terminal) => terminal,
        };

        if *kind != ContainerKind::List {
            return Err(ModelError::Value(format!(
                "cannot apply a {} change to a list",
                kind.as_str()
            )));
        }
        match (del, ins) {
            (None, Some(ins)) => self.insert(index, Value::from_json(ins)).map(Some),
            (Some(del), None) => {
                self.expect_current(index, del)?;
                self.delete(index).map(Some)
            }
            (Some(del), Some(ins)) => {
                self.expect_current(index, del)?;
                if json_equal(del, ins) {
                    return Ok(None);
                }
                self.set(index, Value::from_json(ins))
            }
            (None, None) => Ok(None),
        }
    }

    // ── Observation ───────────────────────────────────────────────────────

    pub fn before_change_callbacks(&self) -> &ChangeListeners {
        self.inner.node.listeners(Phase::Before)
    }

    pub fn after_change_callbacks(&self) -> &ChangeListeners {
        self.inner.node.listeners(Phase::After)
    }

    pub fn subscribe_at<F>(&self, path: impl Into<Path>, phase: Phase, listener: F) -> ListenerId
    where
        F: Fn(&Change) + 'static,
    {
        self.as_container().subscribe_at(path, phase, listener)
    }

    pub fn parents(&self) -> Vec<(Container, Key)> {
        self.inner.node.parents()
    }

    pub fn find<P>(&self, predicate: P) -> Find<P>
    where
        P: FnMut(&Value) -> bool,
    {
        Find::new(self.values(), predicate)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Resolves a signed index against the current length. `overflow` is how
    /// far past the last item the index may point.
    fn normalize(&self, index: isize, overflow: usize) -> Result<usize, ModelError> {
        let size = self.len();
        let resolved = if index < 0 {
            index.checked_add_unsigned(size)
        } else {
            Some(index)
        };
        match resolved {
            Some(at) if at >= 0 && (at as usize) < size + overflow => Ok(at as usize),
            _ => Err(ModelError::Range { index, size }),
        }
    }

    fn get_at(&self, at: usize, index: isize) -> Result<Value, ModelError> {
        let items = self.inner.items.borrow();
        items.get(at).cloned().ok_or(ModelError::Range {
            index,
            size: items.len(),
        })
    }

    fn expect_current(&self, index: isize, del: &JsonValue) -> Result<(), ModelError> {
        let current = self.get(index).map(|value| value.snapshot());
        if current.as_ref().is_some_and(|current| json_equal(current, del)) {
            return Ok(());
        }
        debug!(index, kind = "list", "rejected stale change");
        Err(ModelError::Value(format!(
            "stale change at index {index}: expected {del}, found {}",
            current.map_or_else(|| "nothing".to_string(), |v| v.to_string()),
        )))
    }

    /// Moves the back-references of container items in `items[start..]`
    /// whose position is at least `from` by `delta`.
    fn shift_links(&self, start: usize, from: usize, delta: isize) {
        let mut seen = HashSet::new();
        let children: Vec<Container> = self
            .inner
            .items
            .borrow()
            .iter()
            .skip(start)
            .filter_map(Value::as_container)
            .filter(|child| seen.insert(child.addr()))
            .collect();
        for child in children {
            child.node().shift_indices(self.addr(), from, delta);
        }
    }
}

impl Default for ObservableList {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<JsonValue> for ObservableList {
    type Error = ModelError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Array(items) => Ok(Self::from_json_items(&items)),
            other => Err(ModelError::Type(format!("expected an array, got {other}"))),
        }
    }
}

impl IntoIterator for &ObservableList {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservableList({})", self.snapshot())
    }
}
