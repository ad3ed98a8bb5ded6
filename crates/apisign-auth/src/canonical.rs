//! Canonical string construction.
//!
//! The canonical string is what both sides sign:
//!
//! ```text
//! Path\n
//! name1=value1&name2=value2a&name2=value2b...
//! [\nBase64(HexLower(MD5(body)))]      (POST, PUT and PATCH only)
//! ```
//!
//! Parameter names are sorted byte-wise, the signature parameter `sn` is
//! excluded, empty values are dropped, values of a multi-valued parameter are
//! sorted before emission, and every value is percent-encoded with spaces as
//! `%20`. Transport reordering of parameters or values therefore never changes
//! the signature.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::request::{PARAM_SIGNATURE, Params};

/// The set of characters that must be percent-encoded in parameter values.
///
/// Everything except unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`)
/// is encoded, so a space becomes `%20` rather than `+`.
const VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical string from its components.
///
/// `body` is only consulted for body-bearing methods; an absent body hashes
/// like an empty one.
///
/// # Examples
///
/// ```
/// use apisign_auth::Params;
/// use apisign_auth::canonical::build_canonical_string;
///
/// let params: Params = [("ak", "testAppKey")].into_iter().collect();
/// let canonical = build_canonical_string("/v1/articles/15", &http::Method::GET, &params, None);
/// assert_eq!(canonical, "/v1/articles/15\nak=testAppKey");
/// ```
#[must_use]
pub fn build_canonical_string(
    path: &str,
    method: &http::Method,
    params: &Params,
    body: Option<&[u8]>,
) -> String {
    let query = build_canonical_query(params);
    let mut canonical = format!("{path}\n{query}");

    if carries_body(method) {
        canonical.push('\n');
        canonical.push_str(&hash_body(body.unwrap_or_default()));
    }

    canonical
}

/// Build the `&`-joined parameter section of the canonical string.
///
/// # Examples
///
/// ```
/// use apisign_auth::Params;
/// use apisign_auth::canonical::build_canonical_query;
///
/// let params: Params = [("b", "2"), ("a", "x y"), ("b", "1"), ("sn", "sig")]
///     .into_iter()
///     .collect();
/// assert_eq!(build_canonical_query(&params), "a=x%20y&b=1&b=2");
/// ```
#[must_use]
pub fn build_canonical_query(params: &Params) -> String {
    let mut fragments: Vec<String> = Vec::with_capacity(params.len());

    for (name, values) in params.iter() {
        if name == PARAM_SIGNATURE {
            continue;
        }

        let mut values: Vec<&str> = values
            .iter()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect();
        values.sort_unstable();

        fragments.extend(
            values
                .into_iter()
                .map(|value| format!("{name}={}", encode_value(value))),
        );
    }

    fragments.join("&")
}

/// Digest appended for body-bearing methods: `Base64(HexLower(MD5(body)))`.
///
/// # Examples
///
/// ```
/// use apisign_auth::canonical::hash_body;
///
/// // md5("") = d41d8cd98f00b204e9800998ecf8427e
/// assert_eq!(hash_body(b""), "ZDQxZDhjZDk4ZjAwYjIwNGU5ODAwOTk4ZWNmODQyN2U=");
/// ```
#[must_use]
pub fn hash_body(body: &[u8]) -> String {
    let hex_digest = hex::encode(Md5::digest(body));
    BASE64.encode(hex_digest.as_bytes())
}

/// Whether the method's body takes part in the signature.
#[must_use]
pub fn carries_body(method: &http::Method) -> bool {
    *method == http::Method::POST || *method == http::Method::PUT || *method == http::Method::PATCH
}

/// Percent-encode a single parameter value.
fn encode_value(input: &str) -> String {
    utf8_percent_encode(input, VALUE_ENCODE_SET).to_string()
}
