//! Runtime error types.

use aphid_core::{ChannelError, ContainerError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A service, module or command could not be registered.
    #[error("Registration failed: {0}")]
    Container(#[from] ContainerError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A reply could not be delivered.
    #[error("Reply failed: {0}")]
    Channel(#[from] ChannelError),

    /// The container is still referenced by a running dispatcher or handler.
    #[error("Container is still in use")]
    ContainerInUse,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
