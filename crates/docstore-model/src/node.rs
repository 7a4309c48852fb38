//! Per-container bookkeeping shared by dicts and lists: back-references to
//! every container currently holding this one, and the two listener sets.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use crate::container::Container;
use crate::dict::{DictInner, ObservableDict};
use crate::list::{ListInner, ObservableList};
use crate::listeners::{ChangeListeners, Phase};

/// Where a value sits inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Non-owning handle to a container.
#[derive(Clone)]
pub(crate) enum WeakContainer {
    Dict(Weak<DictInner>),
    List(Weak<ListInner>),
}

impl WeakContainer {
    pub(crate) fn upgrade(&self) -> Option<Container> {
        match self {
            WeakContainer::Dict(weak) => weak
                .upgrade()
                .map(|inner| Container::Dict(ObservableDict::from_inner(inner))),
            WeakContainer::List(weak) => weak
                .upgrade()
                .map(|inner| Container::List(ObservableList::from_inner(inner))),
        }
    }

    pub(crate) fn addr(&self) -> *const () {
        match self {
            WeakContainer::Dict(weak) => weak.as_ptr() as *const (),
            WeakContainer::List(weak) => weak.as_ptr() as *const (),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            WeakContainer::Dict(weak) => weak.strong_count() > 0,
            WeakContainer::List(weak) => weak.strong_count() > 0,
        }
    }
}

#[derive(Clone)]
struct ParentLink {
    owner: WeakContainer,
    key: Key,
}

pub(crate) struct Node {
    parents: RefCell<Vec<ParentLink>>,
    before: ChangeListeners,
    after: ChangeListeners,
}

impl Node {
    pub(crate) fn new() -> Self {
        Self {
            parents: RefCell::new(Vec::new()),
            before: ChangeListeners::new(),
            after: ChangeListeners::new(),
        }
    }

    pub(crate) fn listeners(&self, phase: Phase) -> &ChangeListeners {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
        }
    }

    /// Records a link to `owner`, dropping links whose owner is gone.
    pub(crate) fn add_parent(&self, owner: WeakContainer, key: Key) {
        let mut parents = self.parents.borrow_mut();
        parents.retain(|link| link.owner.is_alive());
        parents.push(ParentLink { owner, key });
    }

    /// Drops one `(owner, key)` link, plus any links whose owner is gone.
    pub(crate) fn remove_parent(&self, owner: *const (), key: &Key) {
        let mut parents = self.parents.borrow_mut();
        if let Some(pos) = parents
            .iter()
            .position(|link| link.owner.addr() == owner && &link.key == key)
        {
            parents.remove(pos);
        }
        parents.retain(|link| link.owner.is_alive());
    }

    /// Renumbers every index link into `owner` at or after `from`.
    pub(crate) fn shift_indices(&self, owner: *const (), from: usize, delta: isize) {
        for link in self.parents.borrow_mut().iter_mut() {
            if link.owner.addr() != owner {
                continue;
            }
            if let Key::Index(index) = &mut link.key {
                if *index >= from {
                    *index = index.saturating_add_signed(delta);
                }
            }
        }
    }

    /// Live `(container, key)` pairs, in the order they were recorded.
    pub(crate) fn parents(&self) -> Vec<(Container, Key)> {
        self.parents
            .borrow()
            .iter()
            .filter_map(|link| link.owner.upgrade().map(|owner| (owner, link.key.clone())))
            .collect()
    }

    #[cfg(test)]
    fn link_count(&self) -> usize {
        self.parents.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use crate::{ObservableDict, ObservableList, Value};

    #[test]
    fn test_links_to_dropped_owners_do_not_pile_up() {
        let child = ObservableDict::new();
        for _ in 0..1000 {
            let owner = ObservableDict::new();
            owner.set("c", &child).unwrap();
        }
        assert!(child.node().link_count() <= 1);
        assert!(child.parents().is_empty());

        let items = ObservableList::new();
        for _ in 0..100 {
            ObservableList::from_values([Value::from(&items)]);
        }
        let keeper = ObservableDict::new();
        keeper.set("items", &items).unwrap();
        assert_eq!(items.node().link_count(), 1);
        assert_eq!(items.parents().len(), 1);
    }
}
