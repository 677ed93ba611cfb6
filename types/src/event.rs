//! Build-event wire format.
//!
//! The agent pushes one JSON text frame per progress update:
//!
//! ```json
//! { "e": "file_created", "message": "src/App.tsx" }
//! ```
//!
//! Failure-shaped events (`command_failed`, `command_error`) carry `error`
//! in place of `message`. Unknown fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of an inbound agent event.
///
/// The finite set the client understands, plus an explicit fallback arm for
/// anything else the backend sends. Unknown kinds are never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Thinking,
    Started,
    FileCreated,
    Command,
    Completed,
    Other(String),
}

impl EventKind {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "thinking" => Self::Thinking,
            "started" => Self::Started,
            "file_created" => Self::FileCreated,
            "command" => Self::Command,
            "completed" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Thinking => "thinking",
            Self::Started => "started",
            Self::FileCreated => "file_created",
            Self::Command => "command",
            Self::Completed => "completed",
            Self::Other(raw) => raw,
        }
    }

    /// Transient kinds are removed from the log once a concrete outcome arrives.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// Concrete outcomes that supersede any transient entry.
    #[must_use]
    pub fn supersedes_transient(&self) -> bool {
        matches!(self, Self::FileCreated | Self::Command)
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(rename = "e")]
    pub kind: EventKind,
    #[serde(alias = "error")]
    pub message: String,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("event frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("event frame is not an agent event: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentEvent {
    #[must_use]
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode(std::str::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentEvent, DecodeError, EventKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_every_known_kind() {
        let cases = [
            ("thinking", EventKind::Thinking),
            ("started", EventKind::Started),
            ("file_created", EventKind::FileCreated),
            ("command", EventKind::Command),
            ("completed", EventKind::Completed),
        ];
        for (raw, expected) in cases {
            let frame = format!(r#"{{"e":"{raw}","message":"m"}}"#);
            let event = AgentEvent::decode(&frame).unwrap();
            assert_eq!(event.kind, expected);
            assert_eq!(event.message, "m");
        }
    }

    #[test]
    fn unknown_kind_is_kept_verbatim() {
        let event = AgentEvent::decode(r#"{"e":"error","message":"boom"}"#).unwrap();
        assert_eq!(event.kind, EventKind::Other("error".to_string()));
        assert_eq!(event.kind.as_str(), "error");
    }

    #[test]
    fn error_field_is_accepted_as_message() {
        let event =
            AgentEvent::decode(r#"{"e":"command_failed","error":"npm ERR!","exit_code":1}"#)
                .unwrap();
        assert_eq!(event.kind, EventKind::Other("command_failed".to_string()));
        assert_eq!(event.message, "npm ERR!");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let event = AgentEvent::decode(
            r#"{"e":"completed","message":"Project Created Successfully","sandbox_id":"sbx"}"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::Completed);
    }

    #[test]
    fn malformed_frames_fail_to_decode() {
        assert!(matches!(
            AgentEvent::decode("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(AgentEvent::decode(r#"{"message":"no kind"}"#).is_err());
        assert!(AgentEvent::decode(r#"{"e":"thinking"}"#).is_err());
        assert!(AgentEvent::decode(r#"["e","message"]"#).is_err());
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        assert!(matches!(
            AgentEvent::decode_bytes(&[0xff, 0xfe]),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn transient_and_superseding_kinds() {
        assert!(EventKind::Started.is_transient());
        assert!(EventKind::FileCreated.supersedes_transient());
        assert!(EventKind::Command.supersedes_transient());
        for kind in [
            EventKind::Thinking,
            EventKind::Started,
            EventKind::Completed,
            EventKind::Other("error".into()),
        ] {
            assert!(!kind.supersedes_transient(), "{kind}");
        }
    }

    #[test]
    fn kind_serializes_back_to_wire_string() {
        let json = serde_json::to_string(&AgentEvent::new(EventKind::FileCreated, "a.ts")).unwrap();
        assert_eq!(json, r#"{"e":"file_created","message":"a.ts"}"#);
    }
}
