//! Error types for the Aphid framework.

use aphid_core::ParameterKind;
use thiserror::Error;

pub use tower::BoxError;

/// Result returned by command handlers.
pub type HandlerResult = Result<(), BoxError>;

/// Why a token list could not be bound to a handler's parameters.
///
/// Binding errors are returned to the caller as data. They are never sent to
/// the message author by the dispatcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// A required parameter had no token. Binding stops at the first one.
    #[error("missing argument \"{parameter}\"")]
    MissingArgument { parameter: String },

    /// A token could not be read as the parameter's kind.
    #[error("argument \"{parameter}\" expects a {expected}, got \"{value}\"")]
    TypeMismatch {
        parameter: String,
        expected: ParameterKind,
        value: String,
    },
}

impl BindError {
    /// Name of the parameter the error is about.
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingArgument { parameter } | Self::TypeMismatch { parameter, .. } => {
                parameter
            }
        }
    }
}

/// Failure to invoke a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The module of the command has no loaded instance.
    #[error("module {module} is not loaded")]
    ModuleNotLoaded { module: String },

    /// No handler service is registered under the command's key.
    #[error("no handler registered for {command}")]
    HandlerNotFound { command: String },

    /// The instance handed to the handler is not of its module type.
    #[error("module instance is not a {expected}")]
    ModuleType { expected: &'static str },
}
