//! Request descriptor and multi-valued form parameters.
//!
//! Parameter names and values are UTF-8 strings. Percent-escapes that do not
//! decode to valid UTF-8 (e.g. `%FF`) are replaced with U+FFFD while parsing,
//! so a signer that signs the raw bytes will not match.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::canonical::carries_body;

/// Caller identifier parameter.
pub const PARAM_APP_KEY: &str = "ak";
/// Unix-seconds timestamp parameter (unique-sign mode).
pub const PARAM_TIMESTAMP: &str = "ts";
/// One-time nonce parameter (unique-sign mode).
pub const PARAM_NONCE: &str = "nc";
/// Signature parameter, excluded from canonicalization.
pub const PARAM_SIGNATURE: &str = "sn";

/// Multi-valued form parameters keyed by name.
///
/// Names iterate in byte-wise ascending order, so insertion order never
/// affects canonicalization. Values keep their insertion order; the canonical
/// string builder sorts them itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, Vec<String>>);

impl Params {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parse an `application/x-www-form-urlencoded` string (a query string).
    ///
    /// # Examples
    ///
    /// ```
    /// use apisign_auth::Params;
    ///
    /// let params = Params::from_query("b=2&a=1&b=hello+world");
    /// assert_eq!(params.get("a"), Some("1"));
    /// assert_eq!(params.values("b"), ["2", "hello world"]);
    /// ```
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::new();
        params.extend_from_query(query);
        params
    }

    /// Append every pair of an urlencoded string.
    ///
    /// Invalid UTF-8 sequences decode to U+FFFD.
    pub fn extend_from_query(&mut self, query: &str) {
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            self.add(name, value);
        }
    }

    /// Append a value to `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// Replace all values of `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), vec![value.into()]);
    }

    /// Replace all values of `name`. An empty list keeps the name with no value.
    pub fn set_values(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.0.insert(name.into(), values);
    }

    /// Remove `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.remove(name)
    }

    /// First value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values of `name`, empty when absent.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// All values of `name` concatenated, empty when absent.
    ///
    /// Reserved parameters (`ak`, `ts`, `nc`, `sn`) are read this way.
    #[must_use]
    pub fn joined(&self, name: &str) -> String {
        self.values(name).concat()
    }

    /// Iterate over `(name, values)` in byte-wise name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as an urlencoded string, names sorted, values in insertion order.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, values) in &self.0 {
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.add(name, value);
        }
        params
    }
}

/// The material a signature covers.
///
/// Built fresh per request and never persisted. `form: None` models a request
/// with no parameter collection at all, which canonicalization rejects.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Request path without the query string, e.g. `/v1/articles/15`.
    pub path: String,
    /// HTTP method.
    pub method: http::Method,
    /// Form parameters (query string plus urlencoded body parameters).
    pub form: Option<Params>,
    /// Raw request body.
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Create a descriptor with an empty form and no body.
    #[must_use]
    pub fn new(path: impl Into<String>, method: http::Method) -> Self {
        Self {
            path: path.into(),
            method,
            form: Some(Params::new()),
            body: None,
        }
    }

    /// Replace the form parameters.
    #[must_use]
    pub fn with_form(mut self, form: Params) -> Self {
        self.form = Some(form);
        self
    }

    /// Drop the form parameters entirely.
    #[must_use]
    pub fn without_form(mut self) -> Self {
        self.form = None;
        self
    }

    /// Set the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Build a descriptor from HTTP request parts and the collected body.
    ///
    /// The form holds the query parameters and, for POST/PUT/PATCH requests
    /// with an `application/x-www-form-urlencoded` content type, the body
    /// parameters as well. The raw body is kept for the body digest either way.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Self {
        let mut form = Params::from_query(parts.uri.query().unwrap_or(""));

        if carries_body(&parts.method) && is_form_urlencoded(parts) {
            form.extend_from_query(&String::from_utf8_lossy(&body));
        }

        Self {
            path: parts.uri.path().to_owned(),
            method: parts.method.clone(),
            form: Some(form),
            body: Some(body),
        }
    }
}

fn is_form_urlencoded(parts: &http::request::Parts) -> bool {
    parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}
