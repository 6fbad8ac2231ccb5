//! Cryptographic utilities for webhook verification.
//!
//! Paystack signs each webhook body with HMAC-SHA512 keyed by the account's
//! secret key and sends the hex digest in `x-paystack-signature`.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Compute HMAC-SHA512 and return the hex-encoded result (128 characters).
///
/// # Errors
///
/// Returns `InvalidLength` if the key is rejected, which HMAC never does for
/// any key size.
pub fn hmac_sha512_hex(secret: &[u8], message: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha512::new_from_slice(secret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature against the HMAC-SHA512 of `body`.
#[must_use]
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    match hmac_sha512_hex(secret.as_bytes(), body) {
        Ok(expected) => constant_time_eq(&expected, &signature.to_ascii_lowercase()),
        Err(_) => false,
    }
}

/// Constant-time string comparison to prevent timing attacks.
///
/// Only the length comparison short-circuits.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
