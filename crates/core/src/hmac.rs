//! HMAC-SHA1 (RFC 2104).

use crate::sha1::{BLOCK_LEN, DIGEST_LEN, Sha1, sha1};

const INNER_PAD: u8 = 0x36;
const OUTER_PAD: u8 = 0x5c;

/// Computes `HMAC-SHA1(key, message)`.
///
/// Keys longer than one block are hashed first; shorter keys are
/// right-padded with zeros.
#[must_use]
pub fn hmac_sha1(key: &[u8], message: &[u8]) -> [u8; DIGEST_LEN] {
    let mut block_key = [0u8; BLOCK_LEN];
    if key.len() > BLOCK_LEN {
        block_key[..DIGEST_LEN].copy_from_slice(&sha1(key));
    } else {
        block_key[..key.len()].copy_from_slice(key);
    }

    let inner_key = block_key.map(|byte| byte ^ INNER_PAD);
    let outer_key = block_key.map(|byte| byte ^ OUTER_PAD);

    let mut inner = Sha1::new();
    inner.update(&inner_key);
    inner.update(message);
    let inner_digest = inner.finalize();

    let mut outer = Sha1::new();
    outer.update(&outer_key);
    outer.update(&inner_digest);
    outer.finalize()
}
