//! Interpreter-owned system context.

use crate::core::{ContextProvider, EventRecord, IoProcessor};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The protected runtime state of one interpreter session.
///
/// The interpreter mutates this between script evaluations; the binding only
/// reads it through [`ContextProvider`]. Share it with the binding as
/// `Rc<RefCell<SystemContext>>`.
#[derive(Clone, Debug)]
pub struct SystemContext {
    name: Option<String>,
    session_id: String,
    io_processors: BTreeMap<String, IoProcessor>,
    event: Option<Arc<EventRecord>>,
    platform_variables: serde_json::Map<String, serde_json::Value>,
    configuration: BTreeSet<String>,
    next_session_sequence: u64,
}

impl SystemContext {
    pub(crate) fn from_parts(
        name: Option<String>,
        session_id: String,
        io_processors: BTreeMap<String, IoProcessor>,
        platform_variables: serde_json::Map<String, serde_json::Value>,
        configuration: BTreeSet<String>,
    ) -> Self {
        Self {
            name,
            session_id,
            io_processors,
            event: None,
            platform_variables,
            configuration,
            next_session_sequence: 0,
        }
    }

    pub fn machine_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn session_id_str(&self) -> &str {
        &self.session_id
    }

    /// Make `event` the current event.
    ///
    /// Always wraps the record in a new `Arc`, so scripts see a new snapshot
    /// even when the record equals the previous one.
    pub fn dispatch(&mut self, event: EventRecord) -> Arc<EventRecord> {
        let event = Arc::new(event);
        tracing::trace!(
            session = %self.session_id,
            event = event.name.as_deref().unwrap_or("<unnamed>"),
            "dispatching event"
        );
        self.event = Some(Arc::clone(&event));
        event
    }

    /// Leave event processing; `_event` becomes absent.
    pub fn clear_event(&mut self) {
        self.event = None;
    }

    pub fn current_event(&self) -> Option<&Arc<EventRecord>> {
        self.event.as_ref()
    }

    /// Add a state to the active configuration. Returns `false` if it was
    /// already active.
    pub fn enter_state(&mut self, state_id: impl Into<String>) -> bool {
        self.configuration.insert(state_id.into())
    }

    /// Remove a state from the active configuration. Returns `false` if it
    /// was not active.
    pub fn exit_state(&mut self, state_id: &str) -> bool {
        self.configuration.remove(state_id)
    }

    /// Replace the whole active configuration.
    pub fn set_configuration<I, S>(&mut self, states: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configuration = states.into_iter().map(Into::into).collect();
    }

    pub fn active_states(&self) -> impl Iterator<Item = &str> {
        self.configuration.iter().map(String::as_str)
    }

    pub fn set_platform_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.platform_variables.insert(key.into(), value);
    }

    pub fn remove_platform_variable(&mut self, key: &str) -> Option<serde_json::Value> {
        self.platform_variables.remove(key)
    }

    pub fn platform_variables(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.platform_variables
    }

    /// Register or replace an I/O processor.
    pub fn register_io_processor(&mut self, name: impl Into<String>, processor: IoProcessor) {
        self.io_processors.insert(name.into(), processor);
    }

    /// Next id for a child session: `"{session_id}-{n}"`, counting from 0.
    pub fn generate_session_id(&mut self) -> String {
        let id = format!("{}-{}", self.session_id, self.next_session_sequence);
        self.next_session_sequence += 1;
        id
    }
}

impl ContextProvider for SystemContext {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn session_id(&self) -> String {
        self.session_id.clone()
    }

    fn io_processors(&self) -> BTreeMap<String, IoProcessor> {
        self.io_processors.clone()
    }

    fn event(&self) -> Option<Arc<EventRecord>> {
        self.event.clone()
    }

    fn extended_state(&self) -> serde_json::Map<String, serde_json::Value> {
        self.platform_variables.clone()
    }

    fn is_in_state(&self, state_id: &str) -> bool {
        self.configuration.contains(state_id)
    }
}
