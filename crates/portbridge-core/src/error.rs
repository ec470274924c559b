//! Error types for portbridge configuration.
//!
//! Only the non-realtime configuration path returns errors. Block processing
//! never fails: abnormal conditions degrade to silence and are recorded in
//! [`Diagnostics`](crate::Diagnostics).

use std::fmt;

/// Errors that can occur while configuring a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Invalid configuration (e.g., zero ports).
    InvalidConfiguration(String),
    /// Operation not valid in the current stream state.
    InvalidState(String),
    /// A compile-time limit would be exceeded.
    LimitExceeded(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Self::LimitExceeded(msg) => write!(f, "Limit exceeded: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Result type for portbridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
