//! # Error Classification
//!
//! Every subsystem error maps onto one of three classes. The class decides
//! what the caller does next: drop the object for good, park it until a
//! dependency resolves, or halt the write path.

use serde::{Deserialize, Serialize};

/// How a failure must be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Structural failure. Final for these exact bytes; never retried.
    Permanent,
    /// State-dependent failure. Retried once the missing dependency arrives.
    Transient,
    /// Store I/O or integrity failure. Halts the write path.
    Resource,
}

impl ErrorClass {
    /// Whether the object may be retried later.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Transient)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Permanent => write!(f, "permanent"),
            ErrorClass::Transient => write!(f, "transient"),
            ErrorClass::Resource => write!(f, "resource"),
        }
    }
}

/// Implemented by every subsystem error enum.
pub trait Classify {
    /// The handling class of this error.
    fn class(&self) -> ErrorClass;
}
