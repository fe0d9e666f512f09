//! The contract between the interpreter and the system-variable binding.
//!
//! The interpreter owns a [`ContextProvider`] for the lifetime of a session
//! and mutates it between script evaluations. The binding only ever reads
//! from it, and reads happen at access time so that scripts always observe
//! the provider's current state.

use super::event::EventRecord;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Type URI of the SCXML event I/O processor.
pub const SCXML_EVENT_PROCESSOR: &str = "http://www.w3.org/TR/scxml/#SCXMLEventProcessor";

/// Short alias of the SCXML event I/O processor.
pub const SCXML_PROCESSOR_ALIAS: &str = "scxml";

/// Descriptor of an I/O processor as exposed through `_ioprocessors`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoProcessor {
    /// Address other entities use to reach this session through the processor.
    pub location: String,
}

impl IoProcessor {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Read access to the interpreter's protected runtime state.
///
/// Every method is a query. Implementations must return the state as it is
/// at the moment of the call; the binding never caches these values, with
/// the single exception of the event snapshot, which is keyed on the
/// identity of the [`Arc`] returned by [`event`](Self::event).
///
/// # Example
///
/// ```rust
/// use scxml_sysvars::core::{ContextProvider, EventRecord, IoProcessor};
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
///
/// struct Fixed;
///
/// impl ContextProvider for Fixed {
///     fn name(&self) -> Option<String> { Some("light".into()) }
///     fn session_id(&self) -> String { "s1".into() }
///     fn io_processors(&self) -> BTreeMap<String, IoProcessor> { BTreeMap::new() }
///     fn event(&self) -> Option<Arc<EventRecord>> { None }
///     fn extended_state(&self) -> serde_json::Map<String, serde_json::Value> {
///         serde_json::Map::new()
///     }
///     fn is_in_state(&self, state_id: &str) -> bool { state_id == "idle" }
/// }
///
/// assert!(Fixed.is_in_state("idle"));
/// ```
pub trait ContextProvider {
    /// Name of the state machine (`_name`), if the document declares one.
    fn name(&self) -> Option<String>;

    /// Unique identifier of the running session (`_sessionid`).
    fn session_id(&self) -> String;

    /// I/O processors keyed by processor type (`_ioprocessors`).
    fn io_processors(&self) -> BTreeMap<String, IoProcessor>;

    /// The event currently being processed, if any.
    ///
    /// A new dispatch must hand out a new `Arc`; returning the same `Arc`
    /// signals that the event has not changed.
    fn event(&self) -> Option<Arc<EventRecord>>;

    /// Platform variables exposed as `_x`.
    fn extended_state(&self) -> serde_json::Map<String, serde_json::Value>;

    /// Whether `state_id` is in the active configuration.
    fn is_in_state(&self, state_id: &str) -> bool;
}

/// Lets the interpreter keep `&mut` access between evaluations while the
/// binding holds a shared handle.
///
/// Reads borrow the cell immutably; a read while the interpreter holds a
/// mutable borrow violates the single-threaded evaluation discipline and
/// panics.
impl<P: ContextProvider + ?Sized> ContextProvider for RefCell<P> {
    fn name(&self) -> Option<String> {
        self.borrow().name()
    }

    fn session_id(&self) -> String {
        self.borrow().session_id()
    }

    fn io_processors(&self) -> BTreeMap<String, IoProcessor> {
        self.borrow().io_processors()
    }

    fn event(&self) -> Option<Arc<EventRecord>> {
        self.borrow().event()
    }

    fn extended_state(&self) -> serde_json::Map<String, serde_json::Value> {
        self.borrow().extended_state()
    }

    fn is_in_state(&self, state_id: &str) -> bool {
        self.borrow().is_in_state(state_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EventType;

    struct Stub {
        session: String,
        active: Vec<String>,
        event: Option<Arc<EventRecord>>,
    }

    impl ContextProvider for Stub {
        fn name(&self) -> Option<String> {
            None
        }

        fn session_id(&self) -> String {
            self.session.clone()
        }

        fn io_processors(&self) -> BTreeMap<String, IoProcessor> {
            BTreeMap::new()
        }

        fn event(&self) -> Option<Arc<EventRecord>> {
            self.event.clone()
        }

        fn extended_state(&self) -> serde_json::Map<String, serde_json::Value> {
            serde_json::Map::new()
        }

        fn is_in_state(&self, state_id: &str) -> bool {
            self.active.iter().any(|s| s == state_id)
        }
    }

    #[test]
    fn refcell_forwards_current_values() {
        let cell = RefCell::new(Stub {
            session: "s1".to_string(),
            active: vec!["idle".to_string()],
            event: None,
        });

        assert_eq!(cell.session_id(), "s1");
        assert!(cell.is_in_state("idle"));
        assert!(cell.event().is_none());

        {
            let mut stub = cell.borrow_mut();
            stub.session = "s2".to_string();
            stub.active = vec!["running".to_string()];
            stub.event = Some(Arc::new(EventRecord::new("go", EventType::Internal)));
        }

        assert_eq!(cell.session_id(), "s2");
        assert!(!cell.is_in_state("idle"));
        assert!(cell.is_in_state("running"));
        assert_eq!(cell.event().unwrap().name.as_deref(), Some("go"));
    }

    #[test]
    fn io_processor_serializes_location() {
        let processor = IoProcessor::new("#_scxml_s1");
        let json = serde_json::to_value(&processor).unwrap();
        assert_eq!(json, serde_json::json!({ "location": "#_scxml_s1" }));
    }
}
