//! Change records produced by every container mutation.
//!
//! A [`Change`] describes a single-key mutation. Its [`Op`] is either the
//! [`Terminal`] `{kind, del, ins}` triple, or another `Change` one level
//! deeper. Listeners on ancestors receive the same mutation re-wrapped with
//! the keys between them and the mutated container.

pub mod codec;

use std::borrow::Cow;

use docstore_path::Path;
use serde_json::Value as JsonValue;

use crate::equal::snapshot_equal;

/// The container type a terminal change was made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Dict,
    List,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Dict => "dict",
            ContainerKind::List => "list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dict" => Some(ContainerKind::Dict),
            "list" => Some(ContainerKind::List),
            _ => None,
        }
    }

    fn of_snapshot(value: &JsonValue) -> Self {
        if value.is_array() {
            ContainerKind::List
        } else {
            ContainerKind::Dict
        }
    }
}

/// The innermost part of a change: previous and new value snapshots.
///
/// `del: None` marks an insertion, `ins: None` a deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub kind: ContainerKind,
    pub del: Option<JsonValue>,
    pub ins: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Terminal(Terminal),
    Nested(Box<Change>),
}

/// A mutation at `key`, possibly nested through further keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    key: String,
    op: Op,
}

impl Change {
    pub fn new(key: impl Into<String>, op: Op) -> Self {
        Self {
            key: key.into(),
            op,
        }
    }

    pub fn terminal(
        key: impl Into<String>,
        kind: ContainerKind,
        del: Option<JsonValue>,
        ins: Option<JsonValue>,
    ) -> Self {
        Self::new(key, Op::Terminal(Terminal { kind, del, ins }))
    }

    pub fn nested(key: impl Into<String>, inner: Change) -> Self {
        Self::new(key, Op::Nested(Box::new(inner)))
    }

    /// Re-expresses this change from the point of view of the container
    /// holding the current one under `key`.
    pub fn wrap(self, key: impl Into<String>) -> Change {
        Change::nested(key, self)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    /// The nested change, if this one is not terminal.
    pub fn inner(&self) -> Option<&Change> {
        match &self.op {
            Op::Nested(inner) => Some(inner),
            Op::Terminal(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.op, Op::Terminal(_))
    }

    /// The terminal op at the end of the chain.
    pub fn terminal_op(&self) -> &Terminal {
        let mut current = self;
        loop {
            match &current.op {
                Op::Terminal(terminal) => return terminal,
                Op::Nested(inner) => current = inner,
            }
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.terminal_op().kind
    }

    pub fn del(&self) -> Option<&JsonValue> {
        self.terminal_op().del.as_ref()
    }

    pub fn ins(&self) -> Option<&JsonValue> {
        self.terminal_op().ins.as_ref()
    }

    /// Number of keys along the chain, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self;
        while let Some(inner) = current.inner() {
            depth += 1;
            current = inner;
        }
        depth
    }

    /// Every key along the chain. Empty keys are skipped.
    pub fn path(&self) -> Path {
        let mut keys = vec![self.key.as_str()];
        let mut current = self;
        while let Some(inner) = current.inner() {
            keys.push(inner.key.as_str());
            current = inner;
        }
        Path::from_steps(keys)
    }

    /// The part of this change visible at `path`, relative to `path`.
    ///
    /// - `path` is this change's path: the terminal op under an empty key.
    /// - `path` is an ancestor of the changed location: the nested change
    ///   below `path`.
    /// - `path` lies inside the changed value: the values found at the
    ///   remaining keys inside `del` and `ins`, or `None` when they are
    ///   equal.
    /// - otherwise `None`.
    pub fn sub_change(&self, path: impl Into<Path>) -> Option<Change> {
        let path = path.into();
        let own = self.path();

        if own == path {
            return Some(Change::new("", Op::Terminal(self.terminal_op().clone())));
        }

        if own.is_sub_path_of(&path) {
            let mut current = self;
            for step in &path {
                while current.key.is_empty() {
                    current = current.inner()?;
                }
                if current.key != *step {
                    return None;
                }
                current = current.inner()?;
            }
            return Some(current.clone());
        }

        if path.is_sub_path_of(&own) {
            let suffix = path.slice(own.len()..);
            let terminal = self.terminal_op();
            let del = terminal
                .del
                .as_ref()
                .and_then(|v| suffix.lookup(v))
                .map(Cow::into_owned);
            let ins = terminal
                .ins
                .as_ref()
                .and_then(|v| suffix.lookup(v))
                .map(Cow::into_owned);
            if snapshot_equal(del.as_ref(), ins.as_ref()) {
                return None;
            }
            let holder = suffix.parent();
            let kind = terminal
                .ins
                .as_ref()
                .and_then(|v| holder.lookup(v))
                .or_else(|| terminal.del.as_ref().and_then(|v| holder.lookup(v)))
                .map(|v| ContainerKind::of_snapshot(&v))
                .unwrap_or(ContainerKind::Dict);
            return Some(Change::terminal("", kind, del, ins));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deep() -> Change {
        Change::terminal("x", ContainerKind::Dict, Some(json!(1)), Some(json!(2)))
            .wrap("child")
            .wrap("root")
    }

    #[test]
    fn test_accessors_delegate_to_terminal() {
        let change = deep();
        assert_eq!(change.key(), "root");
        assert_eq!(change.inner().map(Change::key), Some("child"));
        assert_eq!(change.kind(), ContainerKind::Dict);
        assert_eq!(change.del(), Some(&json!(1)));
        assert_eq!(change.ins(), Some(&json!(2)));
        assert_eq!(change.depth(), 3);
        assert!(!change.is_terminal());
    }

    #[test]
    fn test_path() {
        assert_eq!(deep().path(), Path::parse("root.child.x"));
        let rooted = Change::terminal("", ContainerKind::Dict, None, Some(json!(1)));
        assert!(rooted.path().is_empty());
    }

    #[test]
    fn test_sub_change_same_path() {
        let sub = deep().sub_change("root.child.x").unwrap();
        assert_eq!(sub.key(), "");
        assert!(sub.is_terminal());
        assert_eq!(sub.ins(), Some(&json!(2)));
    }

    #[test]
    fn test_sub_change_ancestor_path() {
        let sub = deep().sub_change("root").unwrap();
        assert_eq!(sub.key(), "child");
        assert_eq!(sub.path(), Path::parse("child.x"));

        assert!(deep().sub_change("other").is_none());
        assert!(deep().sub_change("root.other").is_none());
    }

    #[test]
    fn test_sub_change_inside_value() {
        let change = Change::terminal(
            "cfg",
            ContainerKind::Dict,
            Some(json!({"a": 1, "b": [1, 2]})),
            Some(json!({"a": 1, "b": [1, 3]})),
        );
        assert!(change.sub_change("cfg.a").is_none());

        let sub = change.sub_change("cfg.b.1").unwrap();
        assert_eq!(sub.kind(), ContainerKind::List);
        assert_eq!(sub.del(), Some(&json!(2)));
        assert_eq!(sub.ins(), Some(&json!(3)));

        let added = Change::terminal("cfg", ContainerKind::Dict, None, Some(json!({"n": 5})));
        let sub = added.sub_change("cfg.n").unwrap();
        assert_eq!(sub.del(), None);
        assert_eq!(sub.ins(), Some(&json!(5)));
    }

    #[test]
    fn test_sub_change_disjoint() {
        assert!(deep().sub_change("elsewhere.x").is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ContainerKind::parse("dict"), Some(ContainerKind::Dict));
        assert_eq!(ContainerKind::parse("list"), Some(ContainerKind::List));
        assert_eq!(ContainerKind::parse("set"), None);
        assert_eq!(ContainerKind::List.as_str(), "list");
    }
}
