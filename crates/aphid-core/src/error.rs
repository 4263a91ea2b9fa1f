//! Error types for the Aphid core.
//!
//! Dispatch-time binding errors are defined in `aphid-framework`.

use thiserror::Error;

use crate::component::TypeKey;

// =============================================================================
// Container Errors
// =============================================================================

/// Errors raised while registering or constructing components.
///
/// Both variants are fatal to the call that produced them but never to the
/// process; start-up code is expected to abort at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// A malformed registration call: a rejected type identifier, a command
    /// without triggers, or a constructor that misread its dependencies.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A declared dependency was never registered as a service.
    #[error("{requester} depends on {dependency}, but {dependency} is not loaded")]
    UnresolvedDependency {
        /// The type being constructed.
        requester: TypeKey,
        /// The missing dependency.
        dependency: TypeKey,
    },
}

impl ContainerError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

// =============================================================================
// Channel Errors
// =============================================================================

/// Errors returned by a reply [`Channel`](crate::message::Channel).
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The channel can no longer deliver messages.
    #[error("channel closed")]
    Closed,

    /// Sending failed for a transport-specific reason.
    #[error("failed to send message: {0}")]
    SendFailed(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
