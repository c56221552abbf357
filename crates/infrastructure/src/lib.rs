//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_attempt_repository;
mod in_memory_mfa_repository;
mod system_clock;

pub use in_memory_attempt_repository::InMemoryAttemptRepository;
pub use in_memory_mfa_repository::InMemoryMfaRepository;
pub use system_clock::SystemClock;
