use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::change::{Change, ContainerKind, Op};
use crate::container::Container;
use crate::equal::{json_equal, snapshot_equal};
use crate::error::ModelError;
use crate::find::Find;
use crate::listeners::{ChangeListeners, ListenerId, Phase};
use crate::node::{Key, Node, WeakContainer};
use crate::source::AssignSource;
use crate::value::Value;
use docstore_path::Path;

pub(crate) struct DictInner {
    node: Node,
    entries: RefCell<IndexMap<String, Value>>,
}

/// An observable string-keyed mapping.
///
/// Handles are cheap to clone and share the same underlying dict. Keys keep
/// their insertion order; overwriting a key keeps its position.
///
/// ```
/// use docstore_model::ObservableDict;
/// use serde_json::json;
///
/// let doc = ObservableDict::try_from(json!({"title": "draft"})).unwrap();
/// let change = doc.set("title", "final").unwrap().unwrap();
/// assert_eq!(change.del(), Some(&json!("draft")));
/// assert_eq!(doc.snapshot(), json!({"title": "final"}));
/// ```
#[derive(Clone)]
pub struct ObservableDict {
    inner: Rc<DictInner>,
}

impl ObservableDict {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DictInner {
                node: Node::new(),
                entries: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Builds a dict from plain data, promoting nested objects and arrays.
    pub fn from_map(map: Map<String, JsonValue>) -> Self {
        let dict = Self::new();
        for (key, value) in map.iter() {
            dict.store(key.clone(), Value::from_json(value));
        }
        dict
    }

    /// Builds a dict from existing values without notifying anyone. A fresh
    /// dict has no ancestors, so no value can form a cycle with it.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let dict = Self::new();
        for (key, value) in entries {
            dict.store(key.into(), value.into());
        }
        dict
    }

    pub(crate) fn from_inner(inner: Rc<DictInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }

    pub(crate) fn node(&self) -> &Node {
        &self.inner.node
    }

    pub(crate) fn weak(&self) -> WeakContainer {
        WeakContainer::Dict(Rc::downgrade(&self.inner))
    }

    /// True when both handles refer to the same dict.
    pub fn ptr_eq(&self, other: &ObservableDict) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn as_container(&self) -> Container {
        Container::Dict(self.clone())
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.entries.borrow().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.inner.entries.borrow().values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Iterates over a copy of the current entries.
    pub fn iter(&self) -> std::vec::IntoIter<(String, Value)> {
        self.entries().into_iter()
    }

    /// Deep copy as a plain JSON object.
    pub fn snapshot(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.snapshot()))
            .collect();
        JsonValue::Object(map)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Stores `value` under `key`.
    ///
    /// Returns `Ok(None)` without notifying anyone when the key already
    /// holds a strictly equal value.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Change>, ModelError> {
        let key = key.into();
        let value = value.into();
        let container = self.as_container();
        container.validate_value(&value)?;

        let old = self.get(&key);
        if old.as_ref() == Some(&value) {
            return Ok(None);
        }
        let change = Change::terminal(
            key.clone(),
            ContainerKind::Dict,
            old.as_ref().map(Value::snapshot),
            Some(value.snapshot()),
        );

        container.dispatch(Phase::Before, &change);
        self.store(key.clone(), value);
        debug!(key = %key, kind = "dict", "set");
        container.dispatch(Phase::After, &change);
        Ok(Some(change))
    }

    /// Removes `key`. Returns `None` when it was absent.
    pub fn delete(&self, key: &str) -> Option<Change> {
        let old = self.get(key)?;
        let change = Change::terminal(key, ContainerKind::Dict, Some(old.snapshot()), None);
        let container = self.as_container();

        container.dispatch(Phase::Before, &change);
        let removed = self.inner.entries.borrow_mut().shift_remove(key);
        if let Some(previous) = removed.as_ref().and_then(Value::as_container) {
            previous
                .node()
                .remove_parent(self.addr(), &Key::Name(key.to_string()));
        }
        debug!(key = %key, kind = "dict", "delete");
        container.dispatch(Phase::After, &change);
        Some(change)
    }

    /// Turns this dict into a deep copy of `source` with the fewest changes.
    ///
    /// Keys missing from `source` are deleted first. Keys holding containers
    /// of the same kind on both sides are assigned recursively, everything
    /// else is set. The returned changes are relative to this dict.
    pub fn assign<'a>(
        &self,
        source: impl Into<AssignSource<'a>>,
    ) -> Result<Vec<Change>, ModelError> {
        let source = source.into();
        let entries = source.dict_entries().ok_or_else(|| {
            ModelError::Type(format!("cannot assign {} to a dict", source.type_name()))
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
        let keep: HashSet<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        for key in self.keys() {
            if !keep.contains(key.as_str()) {
                changes.extend(self.delete(&key));
            }
        }

        for (key, new) in entries {
            let child = self
                .get(&key)
                .and_then(|old| old.as_container())
                .filter(|old| Some(old.kind()) == new.kind());
            match child {
                Some(child) => changes.extend(
                    child
                        .assign(new)?
                        .into_iter()
                        .map(|change| change.wrap(key.clone())),
                ),
                None => changes.extend(self.set(key, new.into_value())?),
            }
        }
        Ok(changes)
    }

    /// Replays a change made elsewhere onto this dict.
    ///
    /// The change's `del` must match what is currently stored, otherwise the
    /// change is stale and nothing is modified. Returns the change actually
    /// committed, `None` if it was a no-op.
    pub fn apply(&self, change: &Change) -> Result<Option<Change>, ModelError> {
        let key = change.key();
        let terminal = match change.op() {
            Op::Nested(inner) => {
                let child = self
                    .get(key)
                    .and_then(|value| value.as_container())
                    .ok_or_else(|| {
                        ModelError::Value(format!("no container at key {key:?} to apply to"))
                    })?;
                return Ok(child.apply(inner)?.map(|applied| applied.wrap(key)));
            }
            Op::Terminal(terminal) => terminal,
        };

        if terminal.kind != ContainerKind::Dict {
            return Err(ModelError::Value(format!(
                "cannot apply a {} change to a dict",
                terminal.kind.as_str()
            )));
        }
        let current = self.get(key).map(|value| value.snapshot());
        if !snapshot_equal(current.as_ref(), terminal.del.as_ref()) {
            debug!(key = %key, kind = "dict", "rejected stale change");
            return Err(ModelError::Value(format!(
                "stale change at key {key:?}: expected {}, found {}",
                describe(terminal.del.as_ref()),
                describe(current.as_ref()),
            )));
        }

        match &terminal.ins {
            None => Ok(self.delete(key)),
            Some(ins) if terminal.del.as_ref().is_some_and(|del| json_equal(del, ins)) => Ok(None),
            Some(ins) => self.set(key, Value::from_json(ins)),
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

    /// Stores without validation or notification, keeping parent links in
    /// step with the entry map.
    fn store(&self, key: String, value: Value) {
        let attached = value.as_container();
        let previous = self.inner.entries.borrow_mut().insert(key.clone(), value);
        let link = Key::Name(key);
        if let Some(previous) = previous.as_ref().and_then(Value::as_container) {
            previous.node().remove_parent(self.addr(), &link);
        }
        if let Some(child) = attached {
            child.node().add_parent(self.weak(), link);
        }
    }
}

fn describe(value: Option<&JsonValue>) -> String {
    value.map_or_else(|| "nothing".to_string(), JsonValue::to_string)
}

impl Default for ObservableDict {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<JsonValue> for ObservableDict {
    type Error = ModelError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => Ok(Self::from_map(map)),
            other => Err(ModelError::Type(format!("expected an object, got {other}"))),
        }
    }
}

impl IntoIterator for &ObservableDict {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ObservableDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservableDict({})", self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn dict(value: JsonValue) -> ObservableDict {
        ObservableDict::try_from(value).unwrap()
    }

    #[test]
    fn test_set_and_delete() {
        let d = ObservableDict::new();
        let change = d.set("a", 1).unwrap().unwrap();
        assert_eq!(change.key(), "a");
        assert_eq!(change.del(), None);
        assert_eq!(change.ins(), Some(&json!(1)));
        assert_eq!(d.set("a", 1).unwrap(), None);

        let removed = d.delete("a").unwrap();
        assert_eq!(removed.del(), Some(&json!(1)));
        assert_eq!(removed.ins(), None);
        assert!(d.delete("a").is_none());
        assert!(d.is_empty());
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let d = dict(json!({"a": 1, "b": 2, "c": 3}));
        d.set("b", 20).unwrap();
        assert_eq!(d.keys(), vec!["a", "b", "c"]);
        d.delete("a");
        d.set("a", 10).unwrap();
        assert_eq!(d.keys(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_null_is_a_value() {
        let d = ObservableDict::new();
        let change = d.set("n", Value::Null).unwrap().unwrap();
        assert_eq!(change.ins(), Some(&JsonValue::Null));
        assert!(d.has("n"));
        assert_eq!(d.set("n", Value::Null).unwrap(), None);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let d = dict(json!({"a": 1}));
        assert_eq!(d.set("a", Value::from(json!(1.0))).unwrap(), None);
        assert_eq!(d.snapshot(), json!({"a": 1}));

        let applied = d
            .apply(&Change::terminal("a", ContainerKind::Dict, Some(json!(1.0)), Some(json!(2))))
            .unwrap();
        assert!(applied.is_some());
        assert_eq!(d.snapshot(), json!({"a": 2}));
        assert!(d.assign(&json!({"a": 2.0})).unwrap().is_empty());
    }

    #[test]
    fn test_container_snapshots_in_change() {
        let d = ObservableDict::new();
        let child = dict(json!({"x": [1]}));
        let change = d.set("c", &child).unwrap().unwrap();
        assert_eq!(change.ins(), Some(&json!({"x": [1]})));

        // later edits do not leak into the recorded change
        child.set("y", 2).unwrap();
        assert_eq!(change.ins(), Some(&json!({"x": [1]})));
        assert_eq!(d.snapshot(), json!({"c": {"x": [1], "y": 2}}));
    }

    #[test]
    fn test_parent_links_follow_the_value() {
        let d = ObservableDict::new();
        let child = ObservableDict::new();
        d.set("a", &child).unwrap();
        d.set("b", &child).unwrap();
        let keys: Vec<Key> = child.parents().into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec![Key::from("a"), Key::from("b")]);

        d.set("a", 0).unwrap();
        d.delete("b");
        assert!(child.parents().is_empty());
    }

    #[test]
    fn test_self_reference_rejected() {
        let d = ObservableDict::new();
        let err = d.set("me", &d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicReferenceError);

        let child = ObservableDict::new();
        d.set("child", &child).unwrap();
        assert_eq!(child.set("up", &d).unwrap_err(), ModelError::CyclicReference);
        assert!(!child.has("up"));
    }

    #[test]
    fn test_assign_minimal() {
        let d = dict(json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3}));
        let inner = d.get("b").unwrap();
        let changes = d.assign(&json!({"a": 1, "b": {"x": 1, "y": 5}, "d": 4})).unwrap();

        let paths: Vec<String> = changes.iter().map(|c| c.path().to_string()).collect();
        assert_eq!(paths, vec!["c", "b.y", "d"]);
        assert_eq!(d.snapshot(), json!({"a": 1, "b": {"x": 1, "y": 5}, "d": 4}));
        // the nested dict was edited in place
        assert_eq!(d.get("b").unwrap(), inner);
    }

    #[test]
    fn test_assign_rejects_non_dict() {
        let d = dict(json!({"a": 1}));
        let err = d.assign(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
        assert_eq!(d.snapshot(), json!({"a": 1}));
    }

    #[test]
    fn test_assign_to_itself_is_empty() {
        let d = dict(json!({"a": {"b": 1}}));
        assert!(d.assign(&d).unwrap().is_empty());
    }

    #[test]
    fn test_assign_containing_ancestor_is_atomic() {
        let root = ObservableDict::new();
        let child = dict(json!({"keep": 1}));
        root.set("child", &child).unwrap();

        let source = ObservableDict::from_entries([("other", Value::from(2)), ("loop", Value::from(&root))]);
        assert_eq!(child.assign(&source).unwrap_err(), ModelError::CyclicReference);
        assert_eq!(child.snapshot(), json!({"keep": 1}));
    }

    #[test]
    fn test_apply_terminal() {
        let d = dict(json!({"a": 1}));
        let applied = d
            .apply(&Change::terminal("a", ContainerKind::Dict, Some(json!(1)), Some(json!(2))))
            .unwrap()
            .unwrap();
        assert_eq!(applied.ins(), Some(&json!(2)));

        let err = d
            .apply(&Change::terminal("a", ContainerKind::Dict, Some(json!(1)), Some(json!(3))))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert_eq!(d.snapshot(), json!({"a": 2}));

        d.apply(&Change::terminal("a", ContainerKind::Dict, Some(json!(2)), None))
            .unwrap();
        assert!(!d.has("a"));
    }

    #[test]
    fn test_apply_nested_and_wrong_kind() {
        let d = dict(json!({"inner": {"x": 1}}));
        let change = Change::terminal("x", ContainerKind::Dict, Some(json!(1)), None).wrap("inner");
        let applied = d.apply(&change).unwrap().unwrap();
        assert_eq!(applied.path().to_string(), "inner.x");
        assert_eq!(d.snapshot(), json!({"inner": {}}));

        let wrong = Change::terminal("x", ContainerKind::List, None, Some(json!(1)));
        assert_eq!(d.apply(&wrong).unwrap_err().kind(), ErrorKind::ValueError);
        let missing = Change::terminal("x", ContainerKind::Dict, None, Some(json!(1))).wrap("nope");
        assert_eq!(d.apply(&missing).unwrap_err().kind(), ErrorKind::ValueError);
    }

    #[test]
    fn test_listeners_see_old_then_new() {
        let d = dict(json!({"a": 1}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = Rc::clone(&seen);
            let view = d.clone();
            d.before_change_callbacks()
                .add(move |_| seen.borrow_mut().push(("before", view.snapshot())));
        }
        {
            let seen = Rc::clone(&seen);
            let view = d.clone();
            d.after_change_callbacks()
                .add(move |_| seen.borrow_mut().push(("after", view.snapshot())));
        }
        d.set("a", 2).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![("before", json!({"a": 1})), ("after", json!({"a": 2}))]
        );
    }
}
