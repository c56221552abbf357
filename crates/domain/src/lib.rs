//! Domain entities, invariants, and the TOTP algorithm.

#![forbid(unsafe_code)]

mod attempt;
mod credential;
mod provisioning;
/// RFC 6238 time-based one-time passwords over HMAC-SHA1.
pub mod totp;
mod user;

pub use attempt::{AttemptRecord, AttemptType};
pub use credential::{
    BackupCode, MIN_SECRET_BYTES, MfaCredential, MfaCredentialParts, MfaMethod, SharedSecret,
};
pub use provisioning::provisioning_uri;
pub use user::UserId;
