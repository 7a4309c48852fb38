//! JSON codec for changes.
//!
//! Wire shape:
//!
//! ```text
//! {"key": "a", "op": {"key": "b", "op": {"type": "dict", "del": 1, "ins": 2}}}
//! ```
//!
//! An absent `del` or `ins` means "no value"; an explicit `null` is the
//! value null.

use serde_json::{json, Map, Value};
use thiserror::Error;

use super::{Change, ContainerKind, Op, Terminal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("INVALID_CHANGE: {0}")]
    InvalidChange(String),
}

// ── Serialization ─────────────────────────────────────────────────────────

pub fn to_json(change: &Change) -> Value {
    json!({
        "key": change.key(),
        "op": encode_op(change.op()),
    })
}

pub fn to_json_batch(changes: &[Change]) -> Value {
    Value::Array(changes.iter().map(to_json).collect())
}

fn encode_op(op: &Op) -> Value {
    match op {
        Op::Nested(inner) => to_json(inner),
        Op::Terminal(terminal) => {
            let mut m = Map::new();
            m.insert("type".into(), json!(terminal.kind.as_str()));
            if let Some(del) = &terminal.del {
                m.insert("del".into(), del.clone());
            }
            if let Some(ins) = &terminal.ins {
                m.insert("ins".into(), ins.clone());
            }
            Value::Object(m)
        }
    }
}

// ── Deserialization ───────────────────────────────────────────────────────

pub fn from_json(value: &Value) -> Result<Change, CodecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("change must be an object"))?;
    let key = decode_key(obj.get("key"))?;
    let op = obj.get("op").ok_or_else(|| invalid("missing op"))?;
    Ok(Change::new(key, decode_op(op)?))
}

pub fn from_json_batch(value: &Value) -> Result<Vec<Change>, CodecError> {
    value
        .as_array()
        .ok_or_else(|| invalid("changes must be an array"))?
        .iter()
        .map(from_json)
        .collect()
}

fn decode_key(key: Option<&Value>) -> Result<String, CodecError> {
    match key {
        Some(Value::String(s)) => Ok(s.clone()),
        // list positions may travel as numbers
        Some(Value::Number(n)) if n.is_u64() => Ok(n.to_string()),
        Some(_) => Err(invalid("key must be a string or index")),
        None => Err(invalid("missing key")),
    }
}

fn decode_op(op: &Value) -> Result<Op, CodecError> {
    let obj = op.as_object().ok_or_else(|| invalid("op must be an object"))?;
    if let Some(kind) = obj.get("type") {
        let kind = kind
            .as_str()
            .and_then(ContainerKind::parse)
            .ok_or_else(|| invalid("type must be \"dict\" or \"list\""))?;
        return Ok(Op::Terminal(Terminal {
            kind,
            del: obj.get("del").cloned(),
            ins: obj.get("ins").cloned(),
        }));
    }
    if obj.contains_key("key") {
        return Ok(Op::Nested(Box::new(from_json(op)?)));
    }
    Err(invalid("op must be terminal or a nested change"))
}

fn invalid(msg: &str) -> CodecError {
    CodecError::InvalidChange(msg.to_string())
}
