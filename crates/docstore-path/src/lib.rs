//! Key paths into docstore trees.
//!
//! A [`Path`] is a flat, immutable sequence of keys. Keys are stored as
//! strings; list positions use their decimal form, so the same path can walk
//! both mappings and sequences.
//!
//! # Example
//!
//! ```
//! use docstore_path::Path;
//! use serde_json::json;
//!
//! let path = Path::new(["user.tags", "1"]);
//! assert_eq!(path.len(), 3);
//! assert_eq!(path.leaf(), Some("1"));
//!
//! let doc = json!({"user": {"tags": ["a", "b"]}});
//! assert_eq!(path.lookup(&doc).as_deref(), Some(&json!("b")));
//!
//! assert_eq!(path.to_json_pointer(), "/user/tags/1");
//! ```

use thiserror::Error;

mod lookup;
mod path;
mod pointer;

pub use path::{Path, PathStep, SEPARATOR};
pub use pointer::{escape_component, is_valid_index, unescape_component, MAX_POINTER_LENGTH};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("POINTER_INVALID")]
    PointerInvalid,
    #[error("POINTER_TOO_LONG")]
    PointerTooLong,
}
