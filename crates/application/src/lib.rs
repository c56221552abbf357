//! Application services and ports.

#![forbid(unsafe_code)]

mod mfa_policy;
mod mfa_ports;
mod mfa_service;
mod rate_limit_service;
#[cfg(test)]
mod test_support;

pub use mfa_policy::MfaPolicy;
pub use mfa_ports::{AttemptRepository, Clock, MfaRepository};
pub use mfa_service::{
    ConfirmOutcome, EnrollmentState, MfaService, TotpEnrollment, VerifyOutcome,
    generate_backup_codes, generate_secret, hash_backup_code,
};
pub use rate_limit_service::{LockStatus, RateLimitPolicy, RateLimitService};
