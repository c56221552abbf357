//! Codes are six digits over 30-second steps, the parameters every
//! mainstream authenticator app assumes.

use vigil_core::constant_time_eq;
use vigil_core::hmac::hmac_sha1;

/// Number of digits in a generated code.
pub const TOTP_DIGITS: usize = 6;

/// Length of one time step in seconds.
pub const TOTP_STEP_SECONDS: u64 = 30;

const CODE_MODULUS: u32 = 1_000_000;

/// Computes the RFC 4226 HOTP value for `counter`, including dynamic
/// truncation.
#[must_use]
pub fn hotp(secret: &[u8], counter: u64) -> String {
    let digest = hmac_sha1(secret, &counter.to_be_bytes());
    let offset = usize::from(digest[19] & 0x0f);
    let truncated = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    format!("{:0width$}", truncated % CODE_MODULUS, width = TOTP_DIGITS)
}

/// Generates the code for `unix_time` with the default 30-second step.
#[must_use]
pub fn generate(secret: &[u8], unix_time: u64) -> String {
    generate_at(secret, unix_time, TOTP_STEP_SECONDS)
}

/// Generates the code for `unix_time` with an explicit step length.
#[must_use]
pub fn generate_at(secret: &[u8], unix_time: u64, step_seconds: u64) -> String {
    hotp(secret, unix_time / step_seconds.max(1))
}

/// Checks `token` against the codes of the `window` steps on either side
/// of `unix_time`.
///
/// `window = 1` accepts the previous, current, and next step (±30s of
/// clock skew). Each comparison is constant-time.
#[must_use]
pub fn verify(secret: &[u8], token: &str, unix_time: u64, window: u32) -> bool {
    let Ok(unix_time) = i64::try_from(unix_time) else {
        return false;
    };
    let step = TOTP_STEP_SECONDS as i64;
    let window = i64::from(window);

    (-window..=window).any(|offset| {
        let Some(shifted) = unix_time
            .checked_add(offset * step)
            .and_then(|value| u64::try_from(value).ok())
        else {
            return false;
        };

        constant_time_eq(generate(secret, shifted).as_bytes(), token.as_bytes())
    })
}
