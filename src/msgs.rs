//! Wire-level JSON message shapes.
//!
//! This module only ever looks at the `id` field and which of
//! `result`/`update`/`error` is present; it never interprets request or
//! response bodies, per the scope boundary in the system overview.

use crate::error::{Error, Status};
use serde_json::{Map, Value};
use std::fmt;

/// A request id, as it appears on the wire: either a JSON string or integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestId {
    Str(String),
    Int(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Str(s) => write!(f, "{s:?}"),
            RequestId::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&RequestId> for Value {
    fn from(id: &RequestId) -> Value {
        match id {
            RequestId::Str(s) => Value::String(s.clone()),
            RequestId::Int(n) => Value::Number((*n).into()),
        }
    }
}

/// Which of the three terminal/non-terminal kinds a peer message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Result = 1,
    Update = 2,
    Error = 3,
}

impl ResponseKind {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResponseKind::Update)
    }
}

/// A fully parsed message received from the peer.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Option<RequestId>,
    pub kind: ResponseKind,
    /// The complete JSON text of the line, exactly as received (re-serialized
    /// in canonical form), handed back to callers verbatim.
    pub raw: String,
}

/// Parses one newline-delimited JSON object from the peer.
///
/// Returns `Err` for anything that is not a well-formed JSON object with the
/// structural shape `{id?, result?|update?|error?}` exactly one of the three
/// payload keys present. Such a failure is always a protocol
/// violation; the caller is responsible for tearing down the connection.
/// (See the framing codec's inbound rules.)
pub fn parse_incoming(line: &str) -> Result<IncomingMessage, Error> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        Error::new(
            Status::PeerProtocolViolation,
            format!("malformed JSON frame: {e}"),
        )
    })?;
    let obj = value.as_object().ok_or_else(|| {
        Error::new(
            Status::PeerProtocolViolation,
            "frame is not a JSON object".to_string(),
        )
    })?;

    let mut present = Vec::new();
    if obj.contains_key("result") {
        present.push(ResponseKind::Result);
    }
    if obj.contains_key("update") {
        present.push(ResponseKind::Update);
    }
    if obj.contains_key("error") {
        present.push(ResponseKind::Error);
    }
    let kind = match present.len() {
        1 => present[0],
        0 => {
            return Err(Error::new(
                Status::PeerProtocolViolation,
                "frame has none of result/update/error".to_string(),
            ))
        }
        _ => {
            return Err(Error::new(
                Status::PeerProtocolViolation,
                "frame has more than one of result/update/error".to_string(),
            ))
        }
    };

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(RequestId::Str(s.clone())),
        Some(Value::Number(n)) if n.is_i64() => Some(RequestId::Int(n.as_i64().unwrap())),
        Some(_) => {
            return Err(Error::new(
                Status::PeerProtocolViolation,
                "id field is not a string or integer".to_string(),
            ))
        }
    };

    Ok(IncomingMessage {
        id,
        kind,
        raw: value.to_string(),
    })
}

/// Parses a caller-submitted request, locating or injecting its `id`.
///
/// Returns the request id and the final JSON text to send, with the id
/// present either way. Does not attempt to detect duplicate ids; that
/// requires registry state and is the dispatcher's job.
pub fn prepare_outgoing(raw: &str, next_id: impl FnOnce() -> RequestId) -> Result<(RequestId, String), Error> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::new(Status::InvalidInput, format!("request is not valid JSON: {e}")))?;
    let mut obj: Map<String, Value> = match value {
        Value::Object(o) => o,
        _ => {
            return Err(Error::new(
                Status::InvalidInput,
                "request is not a JSON object".to_string(),
            ))
        }
    };

    let id = match obj.get("id") {
        None | Some(Value::Null) => {
            let id = next_id();
            obj.insert("id".to_string(), Value::from(&id));
            id
        }
        Some(Value::String(s)) => RequestId::Str(s.clone()),
        Some(Value::Number(n)) if n.is_i64() => RequestId::Int(n.as_i64().unwrap()),
        Some(_) => {
            return Err(Error::new(
                Status::InvalidInput,
                "id field must be a JSON string or integer".to_string(),
            ))
        }
    };

    Ok((id, Value::Object(obj).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_missing_id() {
        let (id, line) = prepare_outgoing(r#"{"obj":"session","method":"ping"}"#, || RequestId::Int(7))
            .unwrap();
        assert_eq!(id, RequestId::Int(7));
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["id"], 7);
    }

    #[test]
    fn preserves_existing_id() {
        let (id, line) = prepare_outgoing(r#"{"id":"abc","obj":"x"}"#, || RequestId::Int(99)).unwrap();
        assert_eq!(id, RequestId::Str("abc".into()));
        assert!(line.contains("\"abc\""));
    }

    #[test]
    fn rejects_non_object() {
        assert!(prepare_outgoing("[1,2,3]", || RequestId::Int(1)).is_err());
    }

    #[test]
    fn rejects_bad_id_type() {
        assert!(prepare_outgoing(r#"{"id":1.5}"#, || RequestId::Int(1)).is_err());
    }

    #[test]
    fn parses_result_frame() {
        let m = parse_incoming(r#"{"id":1,"result":{"ok":true}}"#).unwrap();
        assert_eq!(m.kind, ResponseKind::Result);
        assert_eq!(m.id, Some(RequestId::Int(1)));
    }

    #[test]
    fn rejects_frame_with_no_payload_key() {
        assert!(parse_incoming(r#"{"id":1}"#).is_err());
    }

    #[test]
    fn rejects_frame_with_two_payload_keys() {
        assert!(parse_incoming(r#"{"id":1,"result":{},"update":{}}"#).is_err());
    }
}
