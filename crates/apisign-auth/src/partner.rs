//! Partner-compatible signing variants.
//!
//! Some partner protocols sign a plain `name=value&...` string with the key
//! appended as `&key=<key>` and expect a lowercase hex digest. These functions
//! have no freshness or nonce semantics and are independent of the primary
//! scheme in [`crate::signer`].

use sha2::{Digest, Sha256};

use crate::signer::hmac_sha256;

/// Build the partner "valid string" from name/value pairs.
///
/// Pairs with an empty value are dropped. The remaining `name=value` fragments
/// are sorted as whole strings and joined with `&`. Nothing is encoded.
///
/// # Examples
///
/// ```
/// use apisign_auth::partner::build_valid_string;
///
/// let valid = build_valid_string([
///     ("time", "1700000000000"),
///     ("partner_code", "P01"),
///     ("credential_code", ""),
/// ]);
/// assert_eq!(valid, "partner_code=P01&time=1700000000000");
/// ```
pub fn build_valid_string<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut fragments: Vec<String> = pairs
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    fragments.sort_unstable();
    fragments.join("&")
}

/// Lowercase hex SHA-256 of `valid + "&key=" + key`.
#[must_use]
pub fn sha256_hex(valid: &str, key: &str) -> String {
    let message = with_key(valid, key);
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// Lowercase hex HMAC-SHA256, keyed by `key`, of `valid + "&key=" + key`.
#[must_use]
pub fn hmac_sha256_hex(valid: &str, key: &str) -> String {
    let message = with_key(valid, key);
    hex::encode(hmac_sha256(key.as_bytes(), message.as_bytes()))
}

fn with_key(valid: &str, key: &str) -> String {
    format!("{valid}&key={key}")
}
