//! The versioned wire envelope shared by both directions of the protocol.
//!
//! Wire format (one JSON object per frame message):
//! ```text
//! {"type": "<name>", "version": 1, "id"?: <any>, "ts"?: <epoch-ms>, "payload"?: <any>}
//! ```
//!
//! Decoding is deliberately unforgiving: anything that is not an object,
//! carries the wrong `version`, or lacks a string `type` is rejected.  The
//! caller drops rejected frames without replying, because a frame can receive
//! unrelated cross-origin chatter that must never be answered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The single protocol version this widget speaks.
pub const PROTOCOL_VERSION: i64 = 1;

/// Reasons an inbound frame is not a valid envelope.
#[derive(Debug, Error, PartialEq)]
pub enum EnvelopeError {
    /// The text was not JSON at all.
    #[error("frame is not valid JSON")]
    NotJson,

    /// The JSON value was not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// `type` was absent or not a string.
    #[error("envelope has no string `type`")]
    MissingType,

    /// `version` was absent or not an integer.
    #[error("envelope has no integer `version`")]
    MissingVersion,

    /// `version` was an integer other than [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(i64),

    /// An outbound envelope could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message name, e.g. `"setPosition"` or `"ack"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Always [`PROTOCOL_VERSION`] for envelopes that survive decoding.
    pub version: i64,

    /// Correlation token.  Opaque: echoed verbatim in the matching `ack`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Sender timestamp in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,

    /// Message-specific body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Builds an outbound envelope stamped with the current protocol version.
    pub fn outbound(kind: impl Into<String>, payload: Option<Value>, ts: Option<i64>) -> Self {
        Self {
            kind: kind.into(),
            version: PROTOCOL_VERSION,
            id: None,
            ts,
            payload,
        }
    }

    /// The payload, or JSON `null` when absent.
    pub fn payload_or_null(&self) -> Value {
        self.payload.clone().unwrap_or(Value::Null)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes a raw text frame into an [`Envelope`].
///
/// # Errors
///
/// Returns [`EnvelopeError`] on any structural problem; see the module docs.
///
/// # Example
///
/// ```rust
/// use board_core::protocol::envelope::decode_envelope;
///
/// let env = decode_envelope(r#"{"type":"flip","version":1,"id":"7"}"#).unwrap();
/// assert_eq!(env.kind, "flip");
/// assert!(decode_envelope(r#"{"type":"flip","version":2}"#).is_err());
/// ```
pub fn decode_envelope(raw: &str) -> Result<Envelope, EnvelopeError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| EnvelopeError::NotJson)?;
    decode_envelope_value(value)
}

/// Decodes an already-parsed JSON value into an [`Envelope`].
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the value is not an object, the version
/// does not match, or `type` is missing.
pub fn decode_envelope_value(value: Value) -> Result<Envelope, EnvelopeError> {
    let Value::Object(mut obj) = value else {
        return Err(EnvelopeError::NotAnObject);
    };

    let version = obj
        .get("version")
        .and_then(Value::as_i64)
        .ok_or(EnvelopeError::MissingVersion)?;
    if version != PROTOCOL_VERSION {
        return Err(EnvelopeError::UnsupportedVersion(version));
    }

    let kind = match obj.remove("type") {
        Some(Value::String(s)) => s,
        _ => return Err(EnvelopeError::MissingType),
    };

    Ok(Envelope {
        kind,
        version,
        id: take_non_null(&mut obj, "id"),
        // A non-integer timestamp is informational noise, not a reason to drop.
        ts: obj.get("ts").and_then(Value::as_i64),
        payload: take_non_null(&mut obj, "payload"),
    })
}

/// Serializes an envelope to a JSON text frame.
///
/// # Errors
///
/// Returns [`EnvelopeError::Encode`] if serialization fails.
pub fn encode_envelope(env: &Envelope) -> Result<String, EnvelopeError> {
    serde_json::to_string(env).map_err(|e| EnvelopeError::Encode(e.to_string()))
}

fn take_non_null(obj: &mut Map<String, Value>, key: &str) -> Option<Value> {
    match obj.remove(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
