/*!
# JSON Codec

Readable interchange form of frozen trees, used for fixtures and for
inspecting what a run produced.

Objects become maps (key order is kept), arrays become lists and scalars
become values. Two reserved single-key objects carry the scalars JSON has
no native form for:

- `{"$bytes": [202, 254]}` is a byte string
- `{"$class": "a/b/C"}` is a class handle
*/

#[cfg(test)]
mod tests;

use serde_json::{json, Map as JsonMap, Value as Json};
use thiserror::Error;
use tracing::debug;

use crate::tree::{Handle, MetaValue, Metadata, Node, NodeKind, NodeRef, Path, Tree, Value};

const BYTES_KEY: &str = "$bytes";
const CLASS_KEY: &str = "$class";

/// Fixture decoding errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON syntax error: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Unsupported number {number} at {path}: only 64-bit integers are allowed")]
    UnsupportedNumber { path: Path, number: String },

    #[error("Invalid {key} payload at {path}: {reason}")]
    InvalidReserved {
        path: Path,
        key: &'static str,
        reason: String,
    },
}

/// Decode a JSON document into a fresh tree
pub fn decode_json(json: &Json) -> Result<Tree, CodecError> {
    let root = decode_node(json, &Path::root())?;
    let tree = Tree::new(root);
    debug!(tree = %tree.id(), "decoded tree from JSON");
    Ok(tree)
}

/// Parse and decode JSON text
pub fn decode_str(text: &str) -> Result<Tree, CodecError> {
    let json: Json = serde_json::from_str(text)?;
    decode_json(&json)
}

fn decode_node(json: &Json, at: &Path) -> Result<NodeRef, CodecError> {
    let meta = Metadata::of(MetaValue::Path(at.clone()));
    let kind = match json {
        Json::Null => NodeKind::Value(Value::None),
        Json::Bool(b) => NodeKind::Value(Value::Bool(*b)),
        Json::Number(number) => match number.as_i64() {
            Some(i) => NodeKind::Value(Value::Int(i)),
            None => {
                return Err(CodecError::UnsupportedNumber {
                    path: at.clone(),
                    number: number.to_string(),
                })
            }
        },
        Json::String(s) => NodeKind::Value(Value::Str(s.clone())),
        Json::Array(items) => NodeKind::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_node(item, &at.index(i)))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(entries) => match reserved(entries, at)? {
            Some(value) => NodeKind::Value(value),
            None => NodeKind::Map(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), decode_node(value, &at.key(key))?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
        },
    };
    Ok(Node::new(kind, meta))
}

/// Recognize the reserved single-key objects
fn reserved(entries: &JsonMap<String, Json>, at: &Path) -> Result<Option<Value>, CodecError> {
    if entries.len() != 1 {
        return Ok(None);
    }
    if let Some(payload) = entries.get(BYTES_KEY) {
        let invalid = |reason: &str| CodecError::InvalidReserved {
            path: at.clone(),
            key: BYTES_KEY,
            reason: reason.to_string(),
        };
        let items = payload.as_array().ok_or_else(|| invalid("expected an array"))?;
        let bytes = items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| invalid("expected integers in 0..=255"))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        return Ok(Some(Value::Bytes(bytes)));
    }
    if let Some(payload) = entries.get(CLASS_KEY) {
        let name = payload.as_str().ok_or_else(|| CodecError::InvalidReserved {
            path: at.clone(),
            key: CLASS_KEY,
            reason: "expected a string".to_string(),
        })?;
        return Ok(Some(Value::Handle(Handle::Class(name.to_string()))));
    }
    Ok(None)
}

/// Encode a tree; metadata is not part of the output
pub fn encode_json(tree: &Tree) -> Json {
    encode_node(tree.root())
}

/// Pretty-printed JSON text
pub fn encode_string(tree: &Tree) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(&encode_json(tree))?)
}

fn encode_node(node: &NodeRef) -> Json {
    match node.kind() {
        NodeKind::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), encode_node(value)))
                .collect(),
        ),
        NodeKind::List(items) => Json::Array(items.iter().map(encode_node).collect()),
        NodeKind::Value(value) => match value {
            Value::None => Json::Null,
            Value::Int(i) => json!(i),
            Value::Str(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Bytes(bytes) => reserved_object(BYTES_KEY, json!(bytes)),
            Value::Handle(Handle::Class(name)) => reserved_object(CLASS_KEY, Json::String(name.clone())),
        },
    }
}

fn reserved_object(key: &str, payload: Json) -> Json {
    let mut object = JsonMap::new();
    object.insert(key.to_string(), payload);
    Json::Object(object)
}
