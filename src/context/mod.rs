//! A concrete [`ContextProvider`](crate::core::ContextProvider) for
//! interpreters that do not bring their own.

mod builder;
mod error;
mod system;

pub use builder::SystemContextBuilder;
pub use error::BuildError;
pub use system::SystemContext;
