//! Core data model shared by the interpreter and the binding.
//!
//! This module contains the plain values that cross the script boundary:
//! - Event records dispatched by the interpreter
//! - Immutable event snapshots shown to scripts
//! - The context provider contract the interpreter implements
//!
//! Nothing in this module touches a script engine.

mod event;
mod provider;
mod snapshot;

pub use event::{EventRecord, EventType};
pub use provider::{ContextProvider, IoProcessor, SCXML_EVENT_PROCESSOR, SCXML_PROCESSOR_ALIAS};
pub use snapshot::{EventField, EventSnapshot, FieldValue};
