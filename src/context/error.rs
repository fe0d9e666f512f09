//! Build errors for the system context builder.

use thiserror::Error;

/// Errors that can occur when building a [`SystemContext`](super::SystemContext).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Session id must not be empty. Omit .session_id() to generate one")]
    EmptySessionId,

    #[error("I/O processor name must not be empty")]
    EmptyProcessorName,

    #[error("I/O processor '{0}' registered twice")]
    DuplicateProcessor(String),
}
