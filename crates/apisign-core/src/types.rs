//! Common type definitions shared across crates.

use std::fmt;

/// Public caller identifier (the `ak` request parameter).
///
/// An app key is paired 1:1 with a secret that only the signer and the
/// verifier know. The key itself is not secret and may be logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct AppKey(String);

impl AppKey {
    /// Create a new app key.
    ///
    /// Any non-empty string is a valid key; which keys are known is up to the
    /// credential provider.
    ///
    /// # Errors
    /// Returns an error if the key is empty.
    pub fn new(key: impl Into<String>) -> Result<Self, crate::ApiSignError> {
        let key = key.into();
        if key.is_empty() {
            return Err(crate::ApiSignError::InvalidAppKey(key));
        }
        Ok(Self(key))
    }

    /// Get the app key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
