use std::borrow::Cow;

use serde_json::Value;

use crate::path::Path;
use crate::pointer::is_valid_index;

impl Path {
    /// Walks `value` along this path.
    ///
    /// Returns `None` when a key is missing, when a step into an array or a
    /// string is not a valid index (or is past the end), or when a step
    /// tries to enter a scalar. Indexing a string yields its character at
    /// that position as a one-character string.
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<Cow<'a, Value>> {
        let mut current = Cow::Borrowed(value);
        for step in self {
            current = match current {
                Cow::Borrowed(v) => step_into(v, step)?,
                Cow::Owned(v) => Cow::Owned(step_into(&v, step)?.into_owned()),
            };
        }
        Some(current)
    }
}

fn step_into<'a>(value: &'a Value, step: &str) -> Option<Cow<'a, Value>> {
    match value {
        Value::Object(map) => map.get(step).map(Cow::Borrowed),
        Value::Array(items) => items.get(parse_index(step)?).map(Cow::Borrowed),
        Value::String(s) => s
            .chars()
            .nth(parse_index(step)?)
            .map(|c| Cow::Owned(Value::String(c.to_string()))),
        _ => None,
    }
}

fn parse_index(step: &str) -> Option<usize> {
    if !is_valid_index(step) {
        return None;
    }
    step.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_root() {
        let doc = json!(42);
        assert_eq!(Path::root().lookup(&doc).as_deref(), Some(&json!(42)));
    }

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"a": {"b": [10, {"c": true}]}});
        assert_eq!(
            Path::parse("a.b.1.c").lookup(&doc).as_deref(),
            Some(&json!(true))
        );
        assert_eq!(Path::parse("a.b.0").lookup(&doc).as_deref(), Some(&json!(10)));
    }

    #[test]
    fn test_lookup_missing() {
        let doc = json!({"a": {"b": [10]}});
        assert!(Path::parse("a.x").lookup(&doc).is_none());
        assert!(Path::parse("a.b.1").lookup(&doc).is_none());
        assert!(Path::parse("a.b.0.z").lookup(&doc).is_none());
    }

    #[test]
    fn test_lookup_invalid_index() {
        let doc = json!({"list": [1, 2, 3]});
        assert!(Path::parse("list.x").lookup(&doc).is_none());
        assert!(Path::parse("list.01").lookup(&doc).is_none());
        assert!(Path::new(["list", "-1"]).lookup(&doc).is_none());
    }

    #[test]
    fn test_lookup_string_index() {
        let doc = json!({"s": "héllo"});
        assert_eq!(Path::parse("s.1").lookup(&doc).as_deref(), Some(&json!("é")));
        assert_eq!(Path::parse("s.1.0").lookup(&doc).as_deref(), Some(&json!("é")));
        assert!(Path::parse("s.9").lookup(&doc).is_none());
        assert!(Path::parse("s.len").lookup(&doc).is_none());
    }

    #[test]
    fn test_lookup_explicit_null() {
        let doc = json!({"a": null});
        assert_eq!(Path::parse("a").lookup(&doc).as_deref(), Some(&Value::Null));
        assert!(Path::parse("a.b").lookup(&doc).is_none());
    }
}
