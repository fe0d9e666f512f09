//! Binding errors raised at the script boundary.

use thiserror::Error;

/// Errors raised by the system-variable binding.
///
/// `ProtectedVariableViolation` and `InvalidPredicateArgument` are raised
/// while a script runs and surface as that script's failure.
/// `DuplicateBinding` is an integration error during engine setup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("{name} is a protected SCXML system variable")]
    ProtectedVariableViolation { name: String },

    #[error("In() expects a state id string, got {found}")]
    InvalidPredicateArgument { found: String },

    #[error("system variable(s) already bound: {}", names.join(", "))]
    DuplicateBinding { names: Vec<String> },
}

impl BindingError {
    /// The protected name a violation targeted, if this is a violation.
    pub fn violated_name(&self) -> Option<&str> {
        match self {
            Self::ProtectedVariableViolation { name } => Some(name),
            _ => None,
        }
    }

    /// Whether a script engine can surface this error as a script failure
    /// and keep the session alive.
    pub fn is_script_level(&self) -> bool {
        !matches!(self, Self::DuplicateBinding { .. })
    }
}

/// The single write guard shared by every protected variable.
///
/// Always fails; `name` is the exact target of the write, e.g. `_event` or
/// `_event.name`.
pub fn reject_write(name: &str) -> Result<(), BindingError> {
    tracing::warn!(variable = name, "script attempted to write a protected system variable");
    Err(BindingError::ProtectedVariableViolation {
        name: name.to_string(),
    })
}
