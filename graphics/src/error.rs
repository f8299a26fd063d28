//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// A buffer allocation exceeded the device limit.
    #[error("buffer size {requested} exceeds maximum {max}")]
    BufferTooLarge {
        /// Requested size in bytes.
        requested: u64,
        /// Device limit in bytes.
        max: u64,
    },
    /// An operation on a binding point found nothing bound there.
    #[error("no buffer bound to {0}")]
    NoResourceBound(&'static str),
    /// A handle is not known to the backend.
    #[error("invalid handle: {0}")]
    InvalidHandle(u32),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
