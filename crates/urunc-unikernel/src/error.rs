//! Errors raised while building unikernel parameters.

use thiserror::Error;

/// Error type of the unikernel builders.
#[derive(Debug, Error)]
pub enum UnikernelError {
    /// No builder exists for the requested unikernel type.
    #[error("unikernel {kind} not supported")]
    Unsupported {
        /// Requested unikernel type.
        kind: String,
    },

    /// A network parameter cannot be expressed on the guest command line.
    #[error("invalid {field} {value:?} for {kind}")]
    InvalidParameter {
        /// Unikernel type.
        kind: &'static str,
        /// Parameter name.
        field: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The command line was requested before `init`.
    #[error("{kind} was not initialised")]
    NotInitialized {
        /// Unikernel type.
        kind: &'static str,
    },
}

/// Convenience alias for the unikernel builders.
pub type Result<T> = std::result::Result<T, UnikernelError>;
