//! scxml-sysvars: protected SCXML system variables for script datamodels
//!
//! An SCXML interpreter owns runtime state that scripts may read but never
//! change. This crate projects that state into a script namespace as six
//! read-only names (`_name`, `_sessionid`, `_ioprocessors`, `_event`, `_x`
//! and `In`) that always reflect the interpreter's current values.
//!
//! # Core Concepts
//!
//! - **ContextProvider**: The interpreter-side source of truth, read at access time
//! - **EventSnapshot**: Frozen, identity-stable copy of the current event
//! - **SystemContextBinding**: Installs the protected accessors into a namespace
//! - **LuaEvaluator**: A Lua datamodel with the system variables bound
//!
//! # Example
//!
//! ```rust
//! use scxml_sysvars::context::SystemContextBuilder;
//! use scxml_sysvars::core::{EventRecord, EventType};
//! use scxml_sysvars::lua::LuaEvaluator;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let context = Rc::new(RefCell::new(
//!     SystemContextBuilder::new()
//!         .name("traffic-light")
//!         .active_state("red")
//!         .build()
//!         .unwrap(),
//! ));
//!
//! let mut evaluator = LuaEvaluator::new().unwrap();
//! evaluator.bind_system_context(context.clone()).unwrap();
//!
//! context
//!     .borrow_mut()
//!     .dispatch(EventRecord::new("timer", EventType::Internal));
//!
//! assert!(evaluator.eval_cond("In('red') and _event.name == 'timer'").unwrap());
//! assert!(evaluator.eval_script("_name = 'hijacked'").is_err());
//! ```

pub mod binding;
pub mod context;
pub mod core;
pub mod lua;

// Re-export commonly used types
pub use binding::{BindingError, SystemContextBinding};
pub use core::{ContextProvider, EventRecord, EventSnapshot, EventType};
