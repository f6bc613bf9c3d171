//! Wire-level parsing shared by the frame decoders.
//!
//! OCPP-J frames are JSON arrays whose leading element is an integer type
//! tag. The helpers here turn raw text into validated array elements;
//! `peek_identity` extracts just the tag and uniqueId so a caller can route
//! a frame without decoding the full variant.

use serde_json::{Map, Value};

use crate::frame::MessageType;

/// Decoding failure for a raw frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The text is not a well-formed frame of any kind
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The leading type tag names a different frame kind than requested
    #[error("frame type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: MessageType,
        found: MessageType,
    },
}

impl CodecError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Cheap pre-decode: read the type tag and uniqueId of a raw frame
///
/// Used to route a frame (and record it against its uniqueId) before
/// committing to a full variant decode. Only tags 2, 3 and 4 are accepted.
pub fn peek_identity(raw: &str) -> Result<(MessageType, String), CodecError> {
    let items = parse_array(raw)?;
    let message_type = message_type_of(&items)?;
    let unique_id = require_string(&items, 1, "uniqueId")?;
    Ok((message_type, unique_id))
}

/// Parse raw text into the elements of a frame array
pub(crate) fn parse_array(raw: &str) -> Result<Vec<Value>, CodecError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CodecError::malformed(e.to_string()))?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(CodecError::malformed("frame is not a JSON array")),
    }
}

/// Read the leading integer type tag
pub(crate) fn message_type_of(items: &[Value]) -> Result<MessageType, CodecError> {
    let tag = items
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| CodecError::malformed("leading element is not an integer type tag"))?;
    MessageType::from_tag(tag)
        .ok_or_else(|| CodecError::malformed(format!("unsupported type tag {}", tag)))
}

/// Read a required, non-empty string element
pub(crate) fn require_string(
    items: &[Value],
    index: usize,
    field: &str,
) -> Result<String, CodecError> {
    let text = items
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::malformed(format!("element {} ({}) must be a string", index, field)))?;
    if text.is_empty() {
        return Err(CodecError::malformed(format!("{} must be non-empty", field)));
    }
    Ok(text.to_string())
}

/// Read a required string element that may be empty
pub(crate) fn string_field(
    items: &[Value],
    index: usize,
    field: &str,
) -> Result<String, CodecError> {
    items
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CodecError::malformed(format!("element {} ({}) must be a string", index, field)))
}

/// Read a required JSON object element
pub(crate) fn object_field(
    items: &[Value],
    index: usize,
    field: &str,
) -> Result<Map<String, Value>, CodecError> {
    match items.get(index) {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(CodecError::malformed(format!(
            "element {} ({}) must be a JSON object",
            index, field
        ))),
    }
}

/// Read an optional trailing string element; empty normalizes to absent
pub(crate) fn trailing_string(
    items: &[Value],
    index: usize,
    field: &str,
) -> Result<Option<String>, CodecError> {
    match items.get(index) {
        None => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(CodecError::malformed(format!(
            "element {} ({}) must be a string",
            index, field
        ))),
    }
}

/// Read an optional trailing object element; empty normalizes to absent
pub(crate) fn trailing_object(
    items: &[Value],
    index: usize,
    field: &str,
) -> Result<Option<Map<String, Value>>, CodecError> {
    match items.get(index) {
        None => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(CodecError::malformed(format!(
            "element {} ({}) must be a JSON object",
            index, field
        ))),
    }
}
