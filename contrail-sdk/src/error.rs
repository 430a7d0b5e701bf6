//! Errors returned by SDK lifecycle operations.

use thiserror::Error;

/// Errors from flush, export and shutdown operations.
///
/// The span creation path itself never fails; it degrades to no-op handles
/// instead, so these errors only surface from the explicit lifecycle calls.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdkError {
    /// Shutdown was already invoked on this component.
    #[error("shutdown already invoked")]
    AlreadyShutdown,

    /// The operation failed for an implementation-specific reason.
    #[error("operation failed: {0}")]
    InternalFailure(String),
}

/// Result of SDK lifecycle operations.
pub type SdkResult = Result<(), SdkError>;
