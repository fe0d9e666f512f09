//! The fixed set of protected system variables and the values they resolve to.

use super::predicate::InPredicate;
use crate::core::{EventSnapshot, IoProcessor};
use std::collections::BTreeMap;
use std::fmt;

/// A protected name in the script namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemVariable {
    /// `_name`
    Name,
    /// `_sessionid`
    SessionId,
    /// `_ioprocessors`
    IoProcessors,
    /// `_event`
    Event,
    /// `_x`
    X,
    /// `In`
    In,
}

impl SystemVariable {
    /// Every protected name, in installation order.
    pub const ALL: [SystemVariable; 6] = [
        Self::Name,
        Self::SessionId,
        Self::IoProcessors,
        Self::Event,
        Self::X,
        Self::In,
    ];

    /// The name as it appears in the script namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "_name",
            Self::SessionId => "_sessionid",
            Self::IoProcessors => "_ioprocessors",
            Self::Event => "_event",
            Self::X => "_x",
            Self::In => "In",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }

    pub fn is_protected(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

impl fmt::Display for SystemVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a protected variable read resolves to.
#[derive(Clone, Debug)]
pub enum SystemValue {
    /// No value: an unnamed machine's `_name`, or `_event` outside event processing.
    Absent,
    Text(String),
    IoProcessors(BTreeMap<String, IoProcessor>),
    Data(serde_json::Value),
    Event(EventSnapshot),
    Predicate(InPredicate),
}

impl SystemValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventSnapshot> {
        match self {
            Self::Event(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn as_predicate(&self) -> Option<&InPredicate> {
        match self {
            Self::Predicate(predicate) => Some(predicate),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_io_processors(&self) -> Option<&BTreeMap<String, IoProcessor>> {
        match self {
            Self::IoProcessors(processors) => Some(processors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_scxml() {
        let names: Vec<&str> = SystemVariable::ALL.iter().map(|v| v.as_str()).collect();
        assert_eq!(
            names,
            vec!["_name", "_sessionid", "_ioprocessors", "_event", "_x", "In"]
        );
    }

    #[test]
    fn from_name_resolves_only_protected_names() {
        assert_eq!(SystemVariable::from_name("_event"), Some(SystemVariable::Event));
        assert_eq!(SystemVariable::from_name("In"), Some(SystemVariable::In));
        assert_eq!(SystemVariable::from_name("in"), None);
        assert_eq!(SystemVariable::from_name("_scxmlSystemContext"), None);
        assert!(!SystemVariable::is_protected("counter"));
    }

    #[test]
    fn absent_has_no_accessor_value() {
        let value = SystemValue::Absent;
        assert!(value.is_absent());
        assert!(value.as_text().is_none());
        assert!(value.as_event().is_none());
    }
}
