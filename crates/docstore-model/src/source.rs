use serde_json::Value as JsonValue;

use crate::change::ContainerKind;
use crate::container::Container;
use crate::dict::ObservableDict;
use crate::list::ObservableList;
use crate::value::Value;

/// The target of an `assign`: either freshly decoded plain data or a live
/// value.
///
/// Plain data is promoted lazily, only for the parts that end up being set;
/// live containers found in the source are attached as they are.
#[derive(Debug, Clone)]
pub enum AssignSource<'a> {
    Json(&'a JsonValue),
    Node(Value),
}

impl<'a> AssignSource<'a> {
    pub fn kind(&self) -> Option<ContainerKind> {
        match self {
            AssignSource::Json(JsonValue::Object(_)) | AssignSource::Node(Value::Dict(_)) => {
                Some(ContainerKind::Dict)
            }
            AssignSource::Json(JsonValue::Array(_)) | AssignSource::Node(Value::List(_)) => {
                Some(ContainerKind::List)
            }
            _ => None,
        }
    }

    /// Name of the source's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AssignSource::Json(json) => match json {
                JsonValue::Null => "null",
                JsonValue::Bool(_) => "boolean",
                JsonValue::Number(_) => "number",
                JsonValue::String(_) => "string",
                JsonValue::Array(_) => "array",
                JsonValue::Object(_) => "object",
            },
            AssignSource::Node(value) => match value {
                Value::Null => "null",
                Value::Bool(_) => "boolean",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Dict(_) => "dict",
                Value::List(_) => "list",
            },
        }
    }

    pub(crate) fn dict_entries(&self) -> Option<Vec<(String, AssignSource<'a>)>> {
        match self {
            AssignSource::Json(json) => {
                let json: &'a JsonValue = *json;
                let map = json.as_object()?;
                Some(
                    map.iter()
                        .map(|(key, value)| (key.clone(), AssignSource::Json(value)))
                        .collect(),
                )
            }
            AssignSource::Node(Value::Dict(dict)) => Some(
                dict.entries()
                    .into_iter()
                    .map(|(key, value)| (key, AssignSource::Node(value)))
                    .collect(),
            ),
            AssignSource::Node(_) => None,
        }
    }

    pub(crate) fn list_items(&self) -> Option<Vec<AssignSource<'a>>> {
        match self {
            AssignSource::Json(json) => {
                let json: &'a JsonValue = *json;
                let items = json.as_array()?;
                Some(items.iter().map(AssignSource::Json).collect())
            }
            AssignSource::Node(Value::List(list)) => {
                Some(list.values().into_iter().map(AssignSource::Node).collect())
            }
            AssignSource::Node(_) => None,
        }
    }

    /// The source as a storable value, promoting plain data.
    pub fn into_value(self) -> Value {
        match self {
            AssignSource::Json(json) => Value::from_json(json),
            AssignSource::Node(value) => value,
        }
    }

    pub(crate) fn as_container(&self) -> Option<Container> {
        match self {
            AssignSource::Node(value) => value.as_container(),
            AssignSource::Json(_) => None,
        }
    }

    /// Every live container in the source, itself included.
    pub(crate) fn containers(&self) -> Vec<Container> {
        let Some(root) = self.as_container() else {
            return Vec::new();
        };
        let mut out: Vec<Container> = root
            .find(Value::is_container)
            .filter_map(|value| value.as_container())
            .collect();
        out.push(root);
        out
    }
}

impl<'a> From<&'a JsonValue> for AssignSource<'a> {
    fn from(json: &'a JsonValue) -> Self {
        AssignSource::Json(json)
    }
}

impl From<Value> for AssignSource<'_> {
    fn from(value: Value) -> Self {
        AssignSource::Node(value)
    }
}

impl From<&Value> for AssignSource<'_> {
    fn from(value: &Value) -> Self {
        AssignSource::Node(value.clone())
    }
}

impl From<ObservableDict> for AssignSource<'_> {
    fn from(dict: ObservableDict) -> Self {
        AssignSource::Node(Value::Dict(dict))
    }
}

impl From<&ObservableDict> for AssignSource<'_> {
    fn from(dict: &ObservableDict) -> Self {
        AssignSource::Node(Value::Dict(dict.clone()))
    }
}

impl From<ObservableList> for AssignSource<'_> {
    fn from(list: ObservableList) -> Self {
        AssignSource::Node(Value::List(list))
    }
}

impl From<&ObservableList> for AssignSource<'_> {
    fn from(list: &ObservableList) -> Self {
        AssignSource::Node(Value::List(list.clone()))
    }
}

impl From<Container> for AssignSource<'_> {
    fn from(container: Container) -> Self {
        AssignSource::Node(Value::from(container))
    }
}

impl From<&Container> for AssignSource<'_> {
    fn from(container: &Container) -> Self {
        AssignSource::Node(Value::from(container.clone()))
    }
}
