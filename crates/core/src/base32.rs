//! RFC 4648 base32 (`A-Z2-7`).
//!
//! Decoding is lenient: lowercase is accepted and characters outside the
//! alphabet, including `=` padding and the spaces or dashes users paste in
//! from authenticator apps, are skipped.

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Returns the base32 character for the low five bits of `value`.
#[must_use]
pub fn symbol(value: u8) -> char {
    char::from(ALPHABET[usize::from(value & 0x1f)])
}

fn value_of(character: u8) -> Option<u32> {
    match character.to_ascii_uppercase() {
        upper @ b'A'..=b'Z' => Some(u32::from(upper - b'A')),
        digit @ b'2'..=b'7' => Some(u32::from(digit - b'2') + 26),
        _ => None,
    }
}

/// Keeps only alphabet characters, uppercased.
///
/// The result decodes to the same bytes as `input` and is the canonical
/// text form stored and embedded in provisioning URIs.
#[must_use]
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii)
        .map(|character| character.to_ascii_uppercase())
        .filter(|character| value_of(*character as u8).is_some())
        .collect()
}

/// Decodes base32 text into bytes.
///
/// Bits are accumulated most significant first and emitted in whole bytes;
/// a trailing group shorter than eight bits is discarded.
#[must_use]
pub fn decode(input: &str) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for value in input.bytes().filter_map(value_of) {
        buffer = (buffer << 5) | value;
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            output.push(((buffer >> bits) & 0xff) as u8);
        }

        buffer &= (1 << bits) - 1;
    }

    output
}

/// Encodes bytes as base32 with `=` padding to a multiple of eight
/// characters.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    let mut output = encode_unpadded(data);
    while output.len() % 8 != 0 {
        output.push('=');
    }
    output
}

/// Encodes bytes as base32 without padding, the form authenticator apps
/// expect in `otpauth://` URIs.
#[must_use]
pub fn encode_unpadded(data: &[u8]) -> String {
    let mut output = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for byte in data {
        buffer = (buffer << 8) | u32::from(*byte);
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            output.push(symbol(((buffer >> bits) & 0x1f) as u8));
        }

        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        output.push(symbol(((buffer << (5 - bits)) & 0x1f) as u8));
    }

    output
}
