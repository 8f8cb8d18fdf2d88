//! # Card Credential Primitives
//!
//! PIN codes are stored as one-way SHA-256 digests and verified in
//! constant time; the plaintext code never leaves the request that
//! carried it. Card numbers shown to non-privileged roles are masked
//! down to their last four characters.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash a card PIN code for storage. Lowercase hex SHA-256.
pub fn hash_code(code: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(code.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        // Writing to a String is infallible.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Verify a candidate PIN against a stored hash in constant time.
pub fn verify_code(candidate: &str, stored_hash: &str) -> bool {
    let candidate_hash = hash_code(candidate);
    candidate_hash
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

/// Mask a card number down to its last four characters, replacing every
/// preceding character with `*`. Computed from the actual length — a
/// 19-digit number gets 15 mask characters. Numbers of four characters
/// or fewer are returned unmasked.
pub fn mask_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 4 {
        return number.to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    let mut masked = "*".repeat(chars.len() - 4);
    masked.push_str(&visible);
    masked
}
