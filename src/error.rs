//! Error kinds for the ledger, the container runtime and the lifecycle core.
//!
//! Presentation layers wrap these in `anyhow` with context; the core returns them
//! directly so callers can tell a vanished container from an unreachable engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The container engine could not be reached (binary missing, daemon down).
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("GPU requested but the container runtime has no GPU support on this host")]
    GpuUnavailable,

    /// Any other non-zero exit from the runtime.
    #[error("runtime command `{command}` failed: {message}")]
    Runtime { command: String, message: String },

    #[error("ledger storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential encryption error: {0}")]
    Crypto(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ContainerNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
