//! The three OCPP-J frame kinds and their array encoding.
//!
//! On the wire every frame is a JSON array with a fixed element order and a
//! leading integer type tag:
//!
//! | Frame        | Encoding                                                          |
//! |--------------|-------------------------------------------------------------------|
//! | `Call`       | `[2, uniqueId, action, payload]` (+ optional signature)           |
//! | `CallResult` | `[3, uniqueId, payload]` (+ optional signature)                   |
//! | `CallError`  | `[4, uniqueId, errorCode, errorDescription]` (+ optional details) |
//!
//! Optional trailing fields are omitted entirely when empty; the variable
//! arity is part of the protocol, not an artifact. Payloads keep their
//! insertion order so encoding is byte-deterministic.

use serde_json::Value;

use crate::codec::{self, CodecError};

/// A frame's JSON object payload, insertion-ordered
pub type Payload = serde_json::Map<String, Value>;

/// The integer type tag leading every wire frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A request (tag 2)
    Call,
    /// A successful response (tag 3)
    CallResult,
    /// An error response (tag 4)
    CallError,
}

impl MessageType {
    /// Map a wire tag to a message type
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            2 => Some(Self::Call),
            3 => Some(Self::CallResult),
            4 => Some(Self::CallError),
            _ => None,
        }
    }

    /// The wire tag for this message type
    pub fn tag(self) -> u8 {
        match self {
            Self::Call => 2,
            Self::CallResult => 3,
            Self::CallError => 4,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::CallResult => write!(f, "CallResult"),
            Self::CallError => write!(f, "CallError"),
        }
    }
}

/// A request frame
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Sender-chosen correlation key, non-empty
    pub unique_id: String,
    /// The named operation this request represents, non-empty
    pub action: String,
    pub payload: Payload,
    /// Optional trailing signature element
    pub signature: Option<String>,
}

impl Call {
    /// Create a request with an empty payload
    pub fn new(unique_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            action: action.into(),
            payload: Payload::new(),
            signature: None,
        }
    }

    /// Create a request with a prepared payload
    pub fn with_payload(
        unique_id: impl Into<String>,
        action: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            action: action.into(),
            payload,
            signature: None,
        }
    }

    /// Append a key to the payload, preserving insertion order
    pub fn add_payload(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.payload.insert(key.into(), value.into());
    }

    /// Serialize to wire text
    pub fn encode(&self) -> Result<String, CodecError> {
        let mut items = vec![
            Value::from(MessageType::Call.tag()),
            Value::from(self.unique_id.as_str()),
            Value::from(self.action.as_str()),
            Value::Object(self.payload.clone()),
        ];
        if let Some(signature) = &self.signature {
            if !signature.is_empty() {
                items.push(Value::from(signature.as_str()));
            }
        }
        to_text(&items)
    }

    /// Decode from wire text; the tag must be 2
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let items = codec::parse_array(raw)?;
        expect_type(&items, MessageType::Call)?;
        if items.len() != 4 && items.len() != 5 {
            return Err(CodecError::malformed(format!(
                "Call frame must have 4 or 5 elements, got {}",
                items.len()
            )));
        }
        Ok(Self {
            unique_id: codec::require_string(&items, 1, "uniqueId")?,
            action: codec::require_string(&items, 2, "action")?,
            payload: codec::object_field(&items, 3, "payload")?,
            signature: codec::trailing_string(&items, 4, "signature")?,
        })
    }
}

/// A successful response frame
///
/// Carries no action of its own; the answered action is resolved out of band
/// from the correlation entry recorded when the request was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    pub unique_id: String,
    pub payload: Payload,
    pub signature: Option<String>,
}

impl CallResult {
    pub fn new(unique_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            unique_id: unique_id.into(),
            payload,
            signature: None,
        }
    }

    /// Serialize to wire text
    pub fn encode(&self) -> Result<String, CodecError> {
        let mut items = vec![
            Value::from(MessageType::CallResult.tag()),
            Value::from(self.unique_id.as_str()),
            Value::Object(self.payload.clone()),
        ];
        if let Some(signature) = &self.signature {
            if !signature.is_empty() {
                items.push(Value::from(signature.as_str()));
            }
        }
        to_text(&items)
    }

    /// Decode from wire text; the tag must be 3
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let items = codec::parse_array(raw)?;
        expect_type(&items, MessageType::CallResult)?;
        if items.len() != 3 && items.len() != 4 {
            return Err(CodecError::malformed(format!(
                "CallResult frame must have 3 or 4 elements, got {}",
                items.len()
            )));
        }
        Ok(Self {
            unique_id: codec::require_string(&items, 1, "uniqueId")?,
            payload: codec::object_field(&items, 2, "payload")?,
            signature: codec::trailing_string(&items, 3, "signature")?,
        })
    }
}

/// An error response frame
#[derive(Debug, Clone, PartialEq)]
pub struct CallError {
    pub unique_id: String,
    /// One of the standard codes in [`crate::error_code`]
    pub error_code: String,
    pub error_description: String,
    /// Optional trailing details object
    pub error_details: Option<Payload>,
}

impl CallError {
    pub fn new(
        unique_id: impl Into<String>,
        error_code: impl Into<String>,
        error_description: impl Into<String>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            error_code: error_code.into(),
            error_description: error_description.into(),
            error_details: None,
        }
    }

    /// Serialize to wire text
    pub fn encode(&self) -> Result<String, CodecError> {
        let mut items = vec![
            Value::from(MessageType::CallError.tag()),
            Value::from(self.unique_id.as_str()),
            Value::from(self.error_code.as_str()),
            Value::from(self.error_description.as_str()),
        ];
        if let Some(details) = &self.error_details {
            if !details.is_empty() {
                items.push(Value::Object(details.clone()));
            }
        }
        to_text(&items)
    }

    /// Decode from wire text; the tag must be 4
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let items = codec::parse_array(raw)?;
        expect_type(&items, MessageType::CallError)?;
        if items.len() != 4 && items.len() != 5 {
            return Err(CodecError::malformed(format!(
                "CallError frame must have 4 or 5 elements, got {}",
                items.len()
            )));
        }
        Ok(Self {
            unique_id: codec::require_string(&items, 1, "uniqueId")?,
            error_code: codec::require_string(&items, 2, "errorCode")?,
            error_description: codec::string_field(&items, 3, "errorDescription")?,
            error_details: codec::trailing_object(&items, 4, "errorDetails")?,
        })
    }
}

/// Any of the three wire frame kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Call(Call),
    CallResult(CallResult),
    CallError(CallError),
}

impl Frame {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Call(_) => MessageType::Call,
            Self::CallResult(_) => MessageType::CallResult,
            Self::CallError(_) => MessageType::CallError,
        }
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Self::Call(call) => &call.unique_id,
            Self::CallResult(result) => &result.unique_id,
            Self::CallError(error) => &error.unique_id,
        }
    }

    /// Serialize to wire text
    pub fn encode(&self) -> Result<String, CodecError> {
        match self {
            Self::Call(call) => call.encode(),
            Self::CallResult(result) => result.encode(),
            Self::CallError(error) => error.encode(),
        }
    }

    /// Decode any frame kind, dispatching on the leading type tag
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let items = codec::parse_array(raw)?;
        match codec::message_type_of(&items)? {
            MessageType::Call => Call::decode(raw).map(Self::Call),
            MessageType::CallResult => CallResult::decode(raw).map(Self::CallResult),
            MessageType::CallError => CallError::decode(raw).map(Self::CallError),
        }
    }
}

fn expect_type(items: &[Value], expected: MessageType) -> Result<(), CodecError> {
    let found = codec::message_type_of(items)?;
    if found != expected {
        return Err(CodecError::TypeMismatch { expected, found });
    }
    Ok(())
}

fn to_text(items: &[Value]) -> Result<String, CodecError> {
    serde_json::to_string(items).map_err(|e| CodecError::malformed(e.to_string()))
}
