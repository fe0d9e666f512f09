//! Immutable script-visible projection of an event.
//!
//! Scripts never see an [`EventRecord`] directly. They see an
//! [`EventSnapshot`]: a frozen copy of the seven event attributes with no
//! mutators. Cloning a snapshot clones a handle, so the identity of a
//! snapshot can be compared with [`EventSnapshot::ptr_eq`].

use super::event::EventRecord;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// The attributes an event snapshot exposes, and nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventField {
    Name,
    Type,
    SendId,
    Origin,
    OriginType,
    InvokeId,
    Data,
}

impl EventField {
    /// Every exposed field, in declaration order.
    pub const ALL: [EventField; 7] = [
        Self::Name,
        Self::Type,
        Self::SendId,
        Self::Origin,
        Self::OriginType,
        Self::InvokeId,
        Self::Data,
    ];

    /// Name of the field as written in script expressions.
    pub fn script_name(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
            Self::SendId => "sendid",
            Self::Origin => "origin",
            Self::OriginType => "origintype",
            Self::InvokeId => "invokeid",
            Self::Data => "data",
        }
    }

    /// Resolve a script field name. Unknown names resolve to `None`.
    pub fn from_script_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.script_name() == name)
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.script_name())
    }
}

/// Value of a single snapshot field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Data(&'a serde_json::Value),
}

#[derive(Debug, PartialEq, Serialize)]
struct SnapshotFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
    #[serde(rename = "sendid", skip_serializing_if = "Option::is_none")]
    send_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(rename = "origintype", skip_serializing_if = "Option::is_none")]
    origin_type: Option<String>,
    #[serde(rename = "invokeid", skip_serializing_if = "Option::is_none")]
    invoke_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// Frozen, script-visible copy of an [`EventRecord`].
///
/// Unset attributes are absent. Empty strings and a JSON `null` payload count
/// as unset, so scripts never observe `""` or `null` for a missing attribute.
///
/// # Example
///
/// ```rust
/// use scxml_sysvars::core::{EventField, EventRecord, EventSnapshot, EventType, FieldValue};
///
/// let record = EventRecord::new("go", EventType::Internal);
/// let snapshot = EventSnapshot::from_record(&record);
///
/// assert_eq!(snapshot.name(), Some("go"));
/// assert_eq!(snapshot.field(EventField::Type), Some(FieldValue::Text("internal")));
/// assert_eq!(snapshot.send_id(), None);
///
/// let same = snapshot.clone();
/// assert!(snapshot.ptr_eq(&same));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EventSnapshot(Arc<SnapshotFields>);

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl EventSnapshot {
    /// Copy every attribute of `record` into a new frozen snapshot.
    pub fn from_record(record: &EventRecord) -> Self {
        Self(Arc::new(SnapshotFields {
            name: present(&record.name),
            event_type: record.event_type.map(|t| t.as_str().to_string()),
            send_id: present(&record.send_id),
            origin: present(&record.origin),
            origin_type: present(&record.origin_type),
            invoke_id: present(&record.invoke_id),
            data: record.data.clone().filter(|d| !d.is_null()),
        }))
    }

    /// Look up a field by its typed name.
    pub fn field(&self, field: EventField) -> Option<FieldValue<'_>> {
        let fields = &*self.0;
        let text = match field {
            EventField::Name => &fields.name,
            EventField::Type => &fields.event_type,
            EventField::SendId => &fields.send_id,
            EventField::Origin => &fields.origin,
            EventField::OriginType => &fields.origin_type,
            EventField::InvokeId => &fields.invoke_id,
            EventField::Data => return fields.data.as_ref().map(FieldValue::Data),
        };
        text.as_deref().map(FieldValue::Text)
    }

    /// Look up a field by its script name. Names outside the seven exposed
    /// fields are always absent.
    pub fn get(&self, script_name: &str) -> Option<FieldValue<'_>> {
        EventField::from_script_name(script_name).and_then(|f| self.field(f))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn event_type(&self) -> Option<&str> {
        self.0.event_type.as_deref()
    }

    pub fn send_id(&self) -> Option<&str> {
        self.0.send_id.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.0.origin.as_deref()
    }

    pub fn origin_type(&self) -> Option<&str> {
        self.0.origin_type.as_deref()
    }

    pub fn invoke_id(&self) -> Option<&str> {
        self.0.invoke_id.as_deref()
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.0.data.as_ref()
    }

    /// Whether both handles refer to the same snapshot instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Serialize for EventSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
