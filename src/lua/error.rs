//! Error types for Lua script evaluation.

use crate::binding::BindingError;
use thiserror::Error;

/// Errors that can occur while evaluating SCXML expressions in Lua.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A system-variable rule was broken by the script or the host.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Lua VM error outside of any evaluation.
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// The expression failed to compile or raised an error.
    #[error("eval('{expression}'): {message}")]
    Evaluation { expression: String, message: String },

    /// Evaluator settings were rejected.
    #[error("invalid evaluator config: {0}")]
    InvalidConfig(String),

    /// A value could not be converted between Lua and JSON.
    #[error("conversion error: {0}")]
    Conversion(String),
}

impl ScriptError {
    /// Classify an error raised while evaluating `expression`.
    ///
    /// Binding errors raised by protected accessors keep their type no
    /// matter how deeply mlua wrapped them.
    pub(crate) fn from_evaluation(expression: &str, err: mlua::Error) -> Self {
        if let Some(binding) = find_binding_error(&err) {
            return Self::Binding(binding);
        }
        Self::Evaluation {
            expression: expression.to_string(),
            message: format_lua_error(&err),
        }
    }

    /// The binding error carried by this failure, if any.
    pub fn binding(&self) -> Option<&BindingError> {
        match self {
            Self::Binding(err) => Some(err),
            _ => None,
        }
    }
}

fn find_binding_error(err: &mlua::Error) -> Option<BindingError> {
    match err {
        mlua::Error::ExternalError(inner) => {
            let inner: &dyn std::error::Error = &**inner;
            inner.downcast_ref::<BindingError>().cloned()
        }
        mlua::Error::CallbackError { cause, .. } => find_binding_error(cause),
        mlua::Error::WithContext { cause, .. } => find_binding_error(cause),
        _ => None,
    }
}

fn format_lua_error(err: &mlua::Error) -> String {
    match err {
        mlua::Error::RuntimeError(msg) => msg.clone(),
        mlua::Error::CallbackError { cause, .. } => format_lua_error(cause),
        mlua::Error::SyntaxError { message, .. } => format!("compile error: {message}"),
        _ => format!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn binding_errors_are_recovered_from_callbacks() {
        let err = mlua::Error::CallbackError {
            traceback: String::new(),
            cause: Arc::new(mlua::Error::external(BindingError::ProtectedVariableViolation {
                name: "_sessionid".to_string(),
            })),
        };

        let script_err = ScriptError::from_evaluation("_sessionid = 1", err);
        assert_eq!(
            script_err.binding().and_then(BindingError::violated_name),
            Some("_sessionid")
        );
    }

    #[test]
    fn other_errors_wrap_the_expression() {
        let err = mlua::Error::RuntimeError("boom".to_string());
        let script_err = ScriptError::from_evaluation("error('boom')", err);

        assert!(script_err.binding().is_none());
        assert_eq!(script_err.to_string(), "eval('error('boom')'): boom");
    }
}
