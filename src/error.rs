//! Crate-wide error taxonomy
//!
//! Errors are returned, never thrown across layers. On failure the output
//! buffer is untouched or deliberately scrubbed and the instance stays in its
//! prior valid state.
#![forbid(unsafe_code)]

use thiserror::Error;

use crate::status::AlgId;

/// Result alias used throughout the crate
pub type Result<T> = core::result::Result<T, Error>;

/// Error kinds of the crypto core
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Null-equivalent input, wrong length, or a disallowed combination
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Operation called in the wrong instance state
    #[error("operation not permitted in current state")]
    InvalidState,

    /// AEAD decrypt authenticity failure (constant-time comparison)
    #[error("authentication tag mismatch")]
    TagMismatch,

    /// The algorithm's power-on self-test latched `failed`; permanent for
    /// this process
    #[error("power-on self-test failed for {0:?}")]
    SelftestFailed(AlgId),

    /// Variant not built in, or no back-end satisfies the required
    /// CPU capabilities
    #[error("algorithm or back-end unsupported")]
    Unsupported,

    /// The memory provider could not satisfy an allocation
    #[error("allocation failure")]
    OutOfMemory,
}
