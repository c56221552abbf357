use sha2::{Digest, Sha256};

use vigil_core::{AppError, AppResult, base32};
use vigil_domain::SharedSecret;

/// Base32 characters in a generated secret (160 bits).
const SECRET_LENGTH: usize = 32;

/// Random bytes behind each backup code (8 hex characters).
const BACKUP_CODE_BYTES: usize = 4;

fn fill_random(bytes: &mut [u8]) -> AppResult<()> {
    getrandom::fill(bytes)
        .map_err(|error| AppError::Internal(format!("secure random source failed: {error}")))
}

/// Generates a 32-character base32 TOTP secret from the OS CSPRNG.
pub fn generate_secret() -> AppResult<SharedSecret> {
    let mut bytes = [0u8; SECRET_LENGTH];
    fill_random(&mut bytes)?;

    // 256 is a multiple of 32, so `byte % 32` is uniform.
    let encoded: String = bytes.iter().map(|byte| base32::symbol(*byte)).collect();
    SharedSecret::new(encoded)
}

/// Generates `count` backup codes of 8 uppercase hex characters each.
pub fn generate_backup_codes(count: u32) -> AppResult<Vec<String>> {
    (0..count)
        .map(|_| {
            let mut bytes = [0u8; BACKUP_CODE_BYTES];
            fill_random(&mut bytes)?;
            Ok(hex::encode_upper(bytes))
        })
        .collect()
}

/// One-way hash of a backup code for storage and comparison.
///
/// Whitespace and dashes are dropped and letters uppercased first, so
/// `"0a1b-2c3d"` and `"0A1B2C3D"` hash identically.
#[must_use]
pub fn hash_backup_code(code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(|character| !character.is_whitespace() && *character != '-')
        .map(|character| character.to_ascii_uppercase())
        .collect();

    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use vigil_core::base32;

    use super::{generate_backup_codes, generate_secret, hash_backup_code};

    #[test]
    fn secret_is_32_base32_characters() {
        let secret = generate_secret();
        assert!(secret.is_ok());
        let secret = secret.unwrap_or_else(|_| unreachable!());

        assert_eq!(secret.as_base32().len(), 32);
        assert!(
            secret
                .as_base32()
                .bytes()
                .all(|byte| byte.is_ascii_uppercase() || (b'2'..=b'7').contains(&byte))
        );
        assert_eq!(base32::decode(secret.as_base32()).len(), 20);
    }

    #[test]
    fn secrets_differ_between_calls() {
        let first = generate_secret().unwrap_or_else(|_| unreachable!());
        let second = generate_secret().unwrap_or_else(|_| unreachable!());
        assert_ne!(first.as_base32(), second.as_base32());
    }

    #[test]
    fn backup_codes_are_uppercase_hex() {
        let codes = generate_backup_codes(10).unwrap_or_default();

        assert_eq!(codes.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 8);
            assert!(
                code.bytes()
                    .all(|byte| byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte))
            );
        }
        assert_eq!(codes.iter().collect::<HashSet<_>>().len(), 10);
    }

    #[test]
    fn hash_is_deterministic_and_normalized() {
        let hash = hash_backup_code("0A1B2C3D");

        assert_eq!(
            hash,
            "7f9ef8181fb81ae369dbadeb33688aa74564769c5ce1588b5d9025ded0fe6a86"
        );
        assert_eq!(hash_backup_code(" 0a1b-2c3d "), hash);
        assert_ne!(hash_backup_code("0A1B2C3E"), hash);
        assert!(!hash.contains("0a1b2c3d"));
    }
}
