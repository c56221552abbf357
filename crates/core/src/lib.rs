//! Shared primitives for all Rust crates in Vigil.

#![forbid(unsafe_code)]

/// RFC 4648 base32 codec used for TOTP shared secrets.
pub mod base32;
/// Keyed hashing built on SHA-1.
pub mod hmac;
/// SHA-1 message digest.
pub mod sha1;

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Result type used across Vigil crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// Expected authentication outcomes (wrong code, lockout) are not errors;
/// services return them as typed results.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input, configuration, or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation is not allowed from the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The persistence collaborator failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Compares two byte strings without short-circuiting on the first
/// mismatching byte.
///
/// Inputs of different length compare unequal; the length itself is not
/// treated as secret.
#[must_use]
pub fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.ct_eq(right).into()
}
