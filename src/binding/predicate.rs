//! The `In()` state-membership predicate.
//!
//! `In` is the only system variable whose value is a function. It answers
//! whether a state id is part of the active configuration by delegating to
//! [`ContextProvider::is_in_state`], without exposing the configuration
//! itself.

use super::error::BindingError;
use crate::core::ContextProvider;
use std::fmt;
use std::rc::Rc;

/// An argument handed to `In` by a script, already classified by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredicateArgument<'a> {
    /// A string. Any string is acceptable, including malformed ids.
    StateId(&'a str),
    /// Anything else, described by the host's type name for it.
    Other(&'a str),
}

/// `In(stateId)` bound to a live context provider.
///
/// # Example
///
/// ```rust
/// use scxml_sysvars::binding::{InPredicate, PredicateArgument};
/// use scxml_sysvars::context::SystemContextBuilder;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let context = SystemContextBuilder::new()
///     .session_id("s1")
///     .active_state("idle")
///     .build()
///     .unwrap();
/// let predicate = InPredicate::new(Rc::new(RefCell::new(context)));
///
/// assert!(predicate.check("idle"));
/// assert!(!predicate.check("running"));
/// assert!(predicate.call(PredicateArgument::Other("number")).is_err());
/// ```
#[derive(Clone)]
pub struct InPredicate {
    provider: Rc<dyn ContextProvider>,
}

impl InPredicate {
    pub fn new(provider: Rc<dyn ContextProvider>) -> Self {
        Self { provider }
    }

    /// Evaluate `In` for a script-supplied argument.
    ///
    /// Never fails for a string argument: unknown, inactive and malformed
    /// state ids all answer `false`.
    pub fn call(&self, argument: PredicateArgument<'_>) -> Result<bool, BindingError> {
        match argument {
            PredicateArgument::StateId(state_id) => Ok(self.check(state_id)),
            PredicateArgument::Other(found) => {
                tracing::warn!(found, "In() called with a non-string argument");
                Err(BindingError::InvalidPredicateArgument {
                    found: found.to_string(),
                })
            }
        }
    }

    /// Whether `state_id` is in the active configuration right now.
    pub fn check(&self, state_id: &str) -> bool {
        self.provider.is_in_state(state_id)
    }
}

impl fmt::Debug for InPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InPredicate")
    }
}
