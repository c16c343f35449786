//! Errors raised by the bridge itself.
//!
//! Operational errors travel in the procedure's own error type, through the sink
//! and the terminal callback. `BridgeError` only covers what the bridge detects
//! around the procedure.

use std::any::Any;

use thiserror::Error;

/// Failure of an [`Invocation`](crate::Invocation) as a whole.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The procedure panicked, either before its first suspension or after a
    /// resumption. The terminal callback was not invoked.
    #[error("procedure `{procedure}` panicked: {message}")]
    Fault {
        /// Label of the faulted procedure.
        procedure: &'static str,
        /// The panic message, if it was a string.
        message: String,
    },
}

impl BridgeError {
    pub(crate) fn fault(procedure: &'static str, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        BridgeError::Fault { procedure, message }
    }
}
