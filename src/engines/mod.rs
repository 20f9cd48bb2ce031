//! Runtime engines
//!
//! Detection, timing and dispatch machinery built on top of the capability
//! data model.

pub mod core;
pub mod dispatch;
pub mod probe;

/// Result type for capability and timing operations
pub type CpuResult<T> = Result<T, CpuError>;

/// Error types for capability and timing operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpuError {
    /// The processor lacks the requested capability
    #[error("Unsupported hardware: {0}")]
    UnsupportedHardware(String),

    /// The processor may have it, but the OS or runtime does not expose it
    #[error("Unsupported software: {0}")]
    UnsupportedSoftware(String),

    /// An underlying OS call failed
    #[error("System failure: {0}")]
    SystemFailure(String),

    /// A resource token is no longer valid
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An enumeration was advanced past its last element
    #[error("Enumeration exhausted")]
    Exhausted,
}

impl From<std::io::Error> for CpuError {
    fn from(err: std::io::Error) -> Self {
        CpuError::SystemFailure(err.to_string())
    }
}
