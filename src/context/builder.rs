//! Builder for constructing system contexts.

use super::error::BuildError;
use super::system::SystemContext;
use crate::core::{IoProcessor, SCXML_EVENT_PROCESSOR, SCXML_PROCESSOR_ALIAS};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Builder for [`SystemContext`] with a fluent API.
///
/// Unless [`without_scxml_processor`](Self::without_scxml_processor) is
/// called, the SCXML event processor is registered under both its type URI
/// and the `scxml` alias, located at `#_scxml_<sessionid>`.
pub struct SystemContextBuilder {
    name: Option<String>,
    session_id: Option<String>,
    io_processors: Vec<(String, IoProcessor)>,
    platform_variables: serde_json::Map<String, serde_json::Value>,
    configuration: BTreeSet<String>,
    scxml_processor: bool,
}

impl SystemContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            name: None,
            session_id: None,
            io_processors: Vec::new(),
            platform_variables: serde_json::Map::new(),
            configuration: BTreeSet::new(),
            scxml_processor: true,
        }
    }

    /// Set the state machine name exposed as `_name`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the session id. A random UUID is used when omitted.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Register an additional I/O processor.
    pub fn io_processor(mut self, name: impl Into<String>, processor: IoProcessor) -> Self {
        self.io_processors.push((name.into(), processor));
        self
    }

    /// Seed a platform variable exposed under `_x`.
    pub fn platform_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.platform_variables.insert(key.into(), value);
        self
    }

    /// Mark a state as active.
    pub fn active_state(mut self, state_id: impl Into<String>) -> Self {
        self.configuration.insert(state_id.into());
        self
    }

    /// Skip the default SCXML event processor registration.
    pub fn without_scxml_processor(mut self) -> Self {
        self.scxml_processor = false;
        self
    }

    /// Build the context.
    /// Returns an error if the session id or a processor name is empty, or
    /// if a processor name is registered twice.
    pub fn build(self) -> Result<SystemContext, BuildError> {
        let session_id = match self.session_id {
            Some(id) if id.is_empty() => return Err(BuildError::EmptySessionId),
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        let mut io_processors = BTreeMap::new();
        if self.scxml_processor {
            let scxml = IoProcessor::new(format!("#_scxml_{session_id}"));
            io_processors.insert(SCXML_EVENT_PROCESSOR.to_string(), scxml.clone());
            io_processors.insert(SCXML_PROCESSOR_ALIAS.to_string(), scxml);
        }

        for (name, processor) in self.io_processors {
            if name.is_empty() {
                return Err(BuildError::EmptyProcessorName);
            }
            if io_processors.contains_key(&name) {
                return Err(BuildError::DuplicateProcessor(name));
            }
            io_processors.insert(name, processor);
        }

        tracing::debug!(
            session = %session_id,
            processors = io_processors.len(),
            "built system context"
        );

        Ok(SystemContext::from_parts(
            self.name,
            session_id,
            io_processors,
            self.platform_variables,
            self.configuration,
        ))
    }
}

impl Default for SystemContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
