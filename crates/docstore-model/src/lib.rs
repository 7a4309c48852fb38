//! Observable document trees.
//!
//! A document is a tree of [`ObservableDict`]s and [`ObservableList`]s with
//! primitive leaves. Every mutation produces a [`Change`] and notifies the
//! listeners of the mutated container and of all its ancestors, each seeing
//! the change relative to itself. `assign` computes the smallest set of
//! changes that turns a container into a copy of other data, and `apply`
//! replays a change produced elsewhere.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use docstore_model::ObservableDict;
//! use serde_json::json;
//!
//! let doc = ObservableDict::try_from(json!({"user": {"name": "ada", "tags": []}})).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! doc.after_change_callbacks()
//!     .add(move |change| log.borrow_mut().push(change.path().to_string()));
//!
//! let changes = doc
//!     .assign(&json!({"user": {"name": "ada", "tags": ["admin"]}}))
//!     .unwrap();
//! assert_eq!(changes.len(), 1);
//! assert_eq!(*seen.borrow(), vec!["user.tags.0"]);
//!
//! let replica = ObservableDict::try_from(json!({"user": {"name": "ada", "tags": []}})).unwrap();
//! replica.apply(&changes[0]).unwrap();
//! assert_eq!(replica.snapshot(), doc.snapshot());
//! ```

pub mod change;
mod container;
mod dict;
mod equal;
mod error;
mod find;
mod list;
mod listeners;
mod node;
mod source;
mod value;

pub use change::{codec, Change, ContainerKind, Op, Terminal};
pub use container::Container;
pub use dict::ObservableDict;
pub use docstore_path::Path;
pub use error::{ErrorKind, ModelError};
pub use find::Find;
pub use list::ObservableList;
pub use listeners::{ChangeListeners, ListenerId, Phase};
pub use node::Key;
pub use source::AssignSource;
pub use value::Value;
