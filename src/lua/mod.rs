//! Lua script host.
//!
//! [`LuaNamespace`] implements [`Namespace`](crate::binding::Namespace) on
//! top of a Lua environment table, and [`LuaEvaluator`] runs SCXML
//! expressions, conditions, assignments and scripts inside it.
//!
//! Scripts only see a whitelisted base library. Protected system variables
//! are resolved through the environment's metatable, so they can be read
//! but not assigned or shadowed. A failed write surfaces as
//! [`ScriptError::Binding`], never as a silent no-op.

mod error;
mod evaluator;
mod event;
mod namespace;

pub use error::ScriptError;
pub use evaluator::{EvaluatorConfig, LuaEvaluator};
pub use event::LuaEventSnapshot;
pub use namespace::LuaNamespace;
