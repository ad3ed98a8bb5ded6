//! HMAC-SHA256 request signatures.
//!
//! `Signature = Base64(HMAC-SHA256(secret, canonical_string))`, standard
//! alphabet with padding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Sign a canonical string with the caller's secret.
///
/// # Examples
///
/// ```
/// use apisign_auth::sign;
///
/// let a = sign("/v1/articles/15\nak=testAppKey", "testAppSecret");
/// let b = sign("/v1/articles/15\nak=testAppKey", "testAppSecret");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 44);
/// ```
#[must_use]
pub fn sign(canonical: &str, secret: &str) -> String {
    BASE64.encode(hmac_sha256(secret.as_bytes(), canonical.as_bytes()))
}

/// Compute a raw HMAC-SHA256 digest.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compare two signatures without short-circuiting on the first difference.
#[must_use]
pub fn signatures_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
