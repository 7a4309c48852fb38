//! Listener registries for change notifications.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::rc::Rc;

use crate::change::Change;

/// Handle returned by [`ChangeListeners::add`], used to unsubscribe.
pub type ListenerId = u64;

type Listener = Rc<dyn Fn(&Change)>;

/// Which side of a mutation a notification is delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The tree is still in its old state.
    Before,
    /// The mutation has been applied.
    After,
}

/// An insertion-ordered set of change callbacks.
///
/// Callbacks take `&Change` and may freely mutate the tree they are attached
/// to; a nested mutation runs to completion, including its own dispatch,
/// before the outer dispatch continues.
///
/// During a dispatch, a callback removed before it was reached is skipped
/// and a callback added during the dispatch is still reached.
pub struct ChangeListeners {
    next_id: Cell<ListenerId>,
    listeners: RefCell<BTreeMap<ListenerId, Listener>>,
}

impl ChangeListeners {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            listeners: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Change) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id.saturating_add(1));
        self.listeners.borrow_mut().insert(id, Rc::new(listener));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.borrow().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub(crate) fn emit(&self, change: &Change) {
        let mut cursor: Option<ListenerId> = None;
        loop {
            // The registry borrow must end before the callback runs.
            let next = {
                let listeners = self.listeners.borrow();
                let mut range = match cursor {
                    None => listeners.range(..),
                    Some(last) => listeners.range((Bound::Excluded(last), Bound::Unbounded)),
                };
                let next = range.next().map(|(id, f)| (*id, Rc::clone(f)));
                next
            };
            let Some((id, listener)) = next else {
                break;
            };
            cursor = Some(id);
            listener(change);
        }
    }
}

impl fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ContainerKind;
    use serde_json::json;

    fn sample() -> Change {
        Change::terminal("k", ContainerKind::Dict, None, Some(json!(1)))
    }

    #[test]
    fn test_emit_in_insertion_order() {
        let set = ChangeListeners::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let log = Rc::clone(&log);
            set.add(move |_| log.borrow_mut().push(n));
        }
        set.emit(&sample());
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove() {
        let set = ChangeListeners::new();
        let id = set.add(|_| {});
        assert!(set.contains(id));
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());
    }

    #[test]
    fn test_removal_during_emit_skips_pending() {
        let set = Rc::new(ChangeListeners::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let second = Rc::new(Cell::new(0));
        let first = {
            let set = Rc::clone(&set);
            let second = Rc::clone(&second);
            let log = Rc::clone(&log);
            move |_: &Change| {
                log.borrow_mut().push("first");
                set.remove(second.get());
            }
        };
        set.add(first);
        let log2 = Rc::clone(&log);
        second.set(set.add(move |_| log2.borrow_mut().push("second")));

        set.emit(&sample());
        assert_eq!(*log.borrow(), vec!["first"]);
    }

    #[test]
    fn test_added_during_emit_is_reached() {
        let set = Rc::new(ChangeListeners::new());
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let set2 = Rc::clone(&set);
            let log = Rc::clone(&log);
            set.add(move |_| {
                log.borrow_mut().push("outer");
                if set2.len() == 1 {
                    let log = Rc::clone(&log);
                    set2.add(move |_| log.borrow_mut().push("late"));
                }
            });
        }
        set.emit(&sample());
        assert_eq!(*log.borrow(), vec!["outer", "late"]);
    }
}
