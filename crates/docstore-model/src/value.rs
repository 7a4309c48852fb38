use std::fmt;

use serde_json::{Map, Number, Value as JsonValue};

use crate::container::Container;
use crate::dict::ObservableDict;
use crate::equal::number_equal;
use crate::error::ModelError;
use crate::list::ObservableList;

/// A value held by a container: a primitive leaf or a nested container.
///
/// Plain JSON objects and arrays converted into a `Value` are promoted to
/// fresh [`ObservableDict`]s and [`ObservableList`]s.
///
/// Equality is strict: primitives compare by value (numbers numerically,
/// so `1` equals `1.0`), containers by identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Dict(ObservableDict),
    List(ObservableList),
}

impl Value {
    /// Converts plain data, promoting objects and arrays to containers.
    pub fn from_json(value: &JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.clone()),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Object(map) => Value::Dict(ObservableDict::from_map(map.clone())),
            JsonValue::Array(items) => Value::List(ObservableList::from_json_items(items)),
        }
    }

    /// Deep copy as plain data.
    pub fn snapshot(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Dict(dict) => dict.snapshot(),
            Value::List(list) => list.snapshot(),
        }
    }

    pub fn as_container(&self) -> Option<Container> {
        match self {
            Value::Dict(dict) => Some(Container::Dict(dict.clone())),
            Value::List(list) => Some(Container::List(list.clone())),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Dict(_) | Value::List(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_dict(&self) -> Option<&ObservableDict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_equal(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Dict(dict) => fmt::Debug::fmt(dict, f),
            Value::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        Value::from_json(&value)
    }
}

impl From<&JsonValue> for Value {
    fn from(value: &JsonValue) -> Self {
        Value::from_json(value)
    }
}

impl From<Map<String, JsonValue>> for Value {
    fn from(map: Map<String, JsonValue>) -> Self {
        Value::Dict(ObservableDict::from_map(map))
    }
}

impl From<ObservableDict> for Value {
    fn from(dict: ObservableDict) -> Self {
        Value::Dict(dict)
    }
}

impl From<&ObservableDict> for Value {
    fn from(dict: &ObservableDict) -> Self {
        Value::Dict(dict.clone())
    }
}

impl From<ObservableList> for Value {
    fn from(list: ObservableList) -> Self {
        Value::List(list)
    }
}

impl From<&ObservableList> for Value {
    fn from(list: &ObservableList) -> Self {
        Value::List(list.clone())
    }
}

impl From<Container> for Value {
    fn from(container: Container) -> Self {
        match container {
            Container::Dict(dict) => Value::Dict(dict),
            Container::List(list) => Value::List(list),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl TryFrom<f64> for Value {
    type Error = ModelError;

    /// Fails for NaN and infinities, which have no plain-data form.
    fn try_from(n: f64) -> Result<Self, Self::Error> {
        Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| ModelError::Type(format!("non-finite number {n} cannot be stored")))
    }
}
