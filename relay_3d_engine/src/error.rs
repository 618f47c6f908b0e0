//! Error types for the Relay3D engine
//!
//! This module defines the error types used throughout the engine,
//! including device creation, frame sequencing and uniform allocation.

use std::fmt;

/// Result type for Relay3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Relay3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (device, backend, subsystems)
    InitializationFailed(String),

    /// Call made in the wrong frame / pass state
    InvalidState(String),

    /// The per-frame uniform ring has no slot left for another draw
    UniformRingExhausted {
        /// Ring capacity in bytes
        capacity: u64,
        /// Byte offset the allocation would have ended at
        requested: u64,
    },

    /// Operation not implemented by this backend
    Unsupported(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::UniformRingExhausted { capacity, requested } => write!(
                f,
                "Uniform ring exhausted: {} bytes needed, capacity is {} bytes",
                requested, capacity
            ),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
