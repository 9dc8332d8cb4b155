//! Fan-out payloads and their encoded frames.
//!
//! A [`Payload`] is a fully-formed JSON object built by the caller. It is
//! encoded once per fan-out call into a [`Frame`]; every recipient gets a
//! clone of that frame, which shares the underlying buffer.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors building or encoding a payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The value was valid JSON but not an object.
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    /// Serialization failed.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An immutable structured message (field → value).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Create an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.0.insert(key.into(), value.into());
        self
    }

    /// Build a payload from any serializable value that encodes to an object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        Self::try_from(serde_json::to_value(value)?)
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `type` field, if present and a string.
    pub fn message_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Serialize to compact JSON. Call once per fan-out.
    pub fn encode(&self) -> Result<Frame, PayloadError> {
        let buf = serde_json::to_vec(&self.0)?;
        Ok(Frame(Bytes::from(buf)))
    }
}

impl TryFrom<Value> for Payload {
    type Error = PayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(PayloadError::NotAnObject("null")),
            Value::Bool(_) => Err(PayloadError::NotAnObject("bool")),
            Value::Number(_) => Err(PayloadError::NotAnObject("number")),
            Value::String(_) => Err(PayloadError::NotAnObject("string")),
            Value::Array(_) => Err(PayloadError::NotAnObject("array")),
        }
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// An encoded payload. Cloning is a refcount bump, never a re-encode.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    /// Raw encoded bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// The frame as UTF-8 text. Frames are always produced from JSON.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.as_str()).finish()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn builder_sets_fields() {
        let payload = Payload::new().with("type", "move").with("ply", 5);
        assert_eq!(payload.message_type(), Some("move"));
        assert_eq!(payload.get("ply"), Some(&json!(5)));
    }

    #[test]
    fn try_from_object() {
        let payload = Payload::try_from(json!({"type": "lobbychat", "message": "hi"})).unwrap();
        assert_eq!(payload.message_type(), Some("lobbychat"));
    }

    #[test]
    fn try_from_rejects_non_objects() {
        assert_matches!(
            Payload::try_from(json!([1, 2])),
            Err(PayloadError::NotAnObject("array"))
        );
        assert_matches!(
            Payload::try_from(json!("move")),
            Err(PayloadError::NotAnObject("string"))
        );
        assert_matches!(Payload::try_from(Value::Null), Err(PayloadError::NotAnObject("null")));
    }

    #[test]
    fn from_serialize_struct() {
        #[derive(Serialize)]
        struct Clock {
            #[serde(rename = "type")]
            kind: &'static str,
            white: u64,
        }
        let payload = Payload::from_serialize(&Clock { kind: "clock", white: 30_000 }).unwrap();
        assert_eq!(payload.message_type(), Some("clock"));
        assert_eq!(payload.get("white"), Some(&json!(30_000)));
    }

    #[test]
    fn encode_is_compact_json() {
        let payload = Payload::try_from(json!({"type": "move", "ply": 5})).unwrap();
        let frame = payload.encode().unwrap();
        let decoded: Value = serde_json::from_slice(frame.bytes()).unwrap();
        assert_eq!(decoded, json!({"type": "move", "ply": 5}));
        assert!(!frame.as_str().contains(' '));
    }

    #[test]
    fn frame_clones_share_the_buffer() {
        let frame = Payload::new().with("type", "ping").encode().unwrap();
        let copy = frame.clone();
        assert_eq!(frame, copy);
        assert_eq!(frame.bytes().as_ptr(), copy.bytes().as_ptr());
        assert_eq!(frame.len(), copy.len());
    }
}
