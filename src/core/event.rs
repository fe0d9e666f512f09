//! Event records dispatched by the interpreter.
//!
//! An [`EventRecord`] is the interpreter's view of the event currently being
//! processed. Records are immutable values: dispatching a new event always
//! produces a new record rather than changing an existing one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin category of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Raised by the platform itself (errors, done events).
    Platform,
    /// Raised by the state chart via `<raise>` or `<send target="#_internal">`.
    Internal,
    /// Received from an external entity or I/O processor.
    External,
}

impl EventType {
    /// Wire name of the event type as seen by scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatched event.
///
/// Every attribute is optional; an attribute is absent unless the originating
/// event set it.
///
/// # Example
///
/// ```rust
/// use scxml_sysvars::core::{EventRecord, EventType};
///
/// let event = EventRecord::new("go", EventType::Internal)
///     .with_send_id("send-1")
///     .with_data(serde_json::json!({ "speed": 3 }));
///
/// assert_eq!(event.name.as_deref(), Some("go"));
/// assert_eq!(event.event_type, Some(EventType::Internal));
/// assert!(event.origin.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The name of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Platform, internal or external.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    /// The sendid, when the sending entity specified one.
    #[serde(rename = "sendid", default, skip_serializing_if = "Option::is_none")]
    pub send_id: Option<String>,
    /// URI of the originating entity of an external event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// I/O processor type of the originating entity.
    #[serde(rename = "origintype", default, skip_serializing_if = "Option::is_none")]
    pub origin_type: Option<String>,
    /// Invoke id of the invocation that produced the event.
    #[serde(rename = "invokeid", default, skip_serializing_if = "Option::is_none")]
    pub invoke_id: Option<String>,
    /// Payload chosen by the sending entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl EventRecord {
    /// Create a record with a name and type and no other attributes.
    pub fn new(name: impl Into<String>, event_type: EventType) -> Self {
        Self {
            name: Some(name.into()),
            event_type: Some(event_type),
            ..Self::default()
        }
    }

    /// Set the sendid.
    #[must_use]
    pub fn with_send_id(mut self, send_id: impl Into<String>) -> Self {
        self.send_id = Some(send_id.into());
        self
    }

    /// Set the origin URI and the origin I/O processor type.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>, origin_type: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self.origin_type = Some(origin_type.into());
        self
    }

    /// Set the invoke id.
    #[must_use]
    pub fn with_invoke_id(mut self, invoke_id: impl Into<String>) -> Self {
        self.invoke_id = Some(invoke_id.into());
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
