//! App key to secret resolution.
//!
//! Signer and verifier both look up the secret of the `ak` parameter through
//! a [`CredentialProvider`]. The gateway uses [`StaticCredentialProvider`],
//! filled from `APISIGN_APP_KEYS`.

use std::collections::HashMap;
use std::fmt;

use crate::error::SignError;

/// Source of app secrets.
///
/// Any string the provider answers for is a usable app key; the provider alone
/// decides which keys exist.
pub trait CredentialProvider: Send + Sync {
    /// Secret paired with `app_key`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::WrongAppKey`] when `app_key` has no secret.
    fn get_secret_key(&self, app_key: &str) -> Result<String, SignError>;
}

/// Fixed app key to secret table.
///
/// App keys paired with an empty secret are dropped on construction and
/// answer [`SignError::WrongAppKey`] like any unknown key.
///
/// # Examples
///
/// ```
/// use apisign_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("testAppKey".to_owned(), "testAppSecret".to_owned()),
/// ]);
///
/// let secret = provider.get_secret_key("testAppKey").unwrap();
/// assert_eq!(secret, "testAppSecret");
/// ```
#[derive(Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from an iterable of (app_key, secret) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .filter(|(_, secret)| !secret.is_empty())
                .collect(),
        }
    }

    /// Number of usable identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no identity is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.credentials.keys().collect();
        keys.sort();
        f.debug_struct("StaticCredentialProvider")
            .field("app_keys", &keys)
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, app_key: &str) -> Result<String, SignError> {
        self.credentials
            .get(app_key)
            .cloned()
            .ok_or_else(|| SignError::WrongAppKey(app_key.to_owned()))
    }
}
