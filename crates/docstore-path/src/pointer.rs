//! Bridging between [`Path`] and RFC 6901 JSON Pointer strings.
//!
//! JSON Pointer is the addressing scheme HTTP collaborators speak; the
//! dotted form is what the tree itself uses.

use crate::path::Path;
use crate::PathError;

/// Maximum accepted pointer string length.
pub const MAX_POINTER_LENGTH: usize = 1024;

/// Decodes a pointer component: `~1` becomes `/`, `~0` becomes `~`.
///
/// Decoding is a single left-to-right pass, so `~01` reads as an escaped
/// tilde followed by `1`. A `~` not followed by `0` or `1` is kept as is.
pub fn unescape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('0') => {
                chars.next();
                out.push('~');
            }
            Some('1') => {
                chars.next();
                out.push('/');
            }
            _ => out.push('~'),
        }
    }
    out
}

/// Encodes a key as a pointer component.
pub fn escape_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            other => out.push(other),
        }
    }
    out
}

/// True when `index` is a canonical non-negative integer: digits only, no
/// leading zero unless it is exactly `"0"`.
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

impl Path {
    /// Formats this path as a JSON Pointer. The root path is `""`.
    pub fn to_json_pointer(&self) -> String {
        let mut out = String::new();
        for step in self {
            out.push('/');
            out.push_str(&escape_component(step));
        }
        out
    }

    /// Parses a JSON Pointer.
    ///
    /// Empty components are dropped since paths hold no empty keys; keys
    /// are taken verbatim and not split on the separator.
    pub fn from_json_pointer(pointer: &str) -> Result<Path, PathError> {
        if pointer.is_empty() {
            return Ok(Path::root());
        }
        if !pointer.starts_with('/') {
            return Err(PathError::PointerInvalid);
        }
        if pointer.len() > MAX_POINTER_LENGTH {
            return Err(PathError::PointerTooLong);
        }
        Ok(Path::from_steps(
            pointer[1..].split('/').map(unescape_component),
        ))
    }
}
