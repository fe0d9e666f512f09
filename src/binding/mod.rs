//! Protected system-variable binding.
//!
//! This module projects a [`ContextProvider`](crate::core::ContextProvider)
//! into a script namespace as six read-only names:
//!
//! | Name            | Resolves to                                     |
//! |-----------------|-------------------------------------------------|
//! | `_name`         | state machine name, or absent                   |
//! | `_sessionid`    | session id                                      |
//! | `_ioprocessors` | I/O processor descriptors                       |
//! | `_event`        | frozen snapshot of the current event, or absent |
//! | `_x`            | platform variables                              |
//! | `In`            | state-membership predicate                      |
//!
//! Every read delegates to the provider at access time. Every write fails
//! with [`BindingError::ProtectedVariableViolation`].
//!
//! # Example
//!
//! ```rust
//! use scxml_sysvars::binding::{NamespaceValue, SimpleNamespace, SystemContextBinding};
//! use scxml_sysvars::context::SystemContextBuilder;
//! use scxml_sysvars::core::{EventRecord, EventType};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let context = Rc::new(RefCell::new(
//!     SystemContextBuilder::new().session_id("s1").build().unwrap(),
//! ));
//! let mut namespace = SimpleNamespace::new();
//! SystemContextBinding::install(&mut namespace, context.clone()).unwrap();
//!
//! context.borrow_mut().dispatch(EventRecord::new("go", EventType::Internal));
//!
//! if let Some(NamespaceValue::System(value)) = namespace.get("_event") {
//!     assert_eq!(value.as_event().and_then(|e| e.name()), Some("go"));
//! }
//! ```

mod cache;
mod error;
mod namespace;
mod predicate;
mod system;
mod variable;

pub use cache::EventSnapshotCache;
pub use error::{reject_write, BindingError};
pub use namespace::{Namespace, NamespaceValue, ProtectedAccessor, ReadFn, SimpleNamespace};
pub use predicate::{InPredicate, PredicateArgument};
pub use system::SystemContextBinding;
pub use variable::{SystemValue, SystemVariable};
