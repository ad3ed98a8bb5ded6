//! Signing options and the canonicalization entry point.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use apisign_core::{AppKey, DEFAULT_SIGN_DURATION_SECS, SignConfig};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::canonical::build_canonical_string;
use crate::credentials::{CredentialProvider, StaticCredentialProvider};
use crate::error::SignError;
use crate::freshness::{check_nonce, check_timestamp};
use crate::request::{PARAM_APP_KEY, PARAM_NONCE, PARAM_TIMESTAMP, RequestDescriptor};

/// Options shared by signer and verifier.
///
/// Read-only after construction; clone it or share it by reference across
/// threads.
#[derive(Clone)]
pub struct SignOption {
    credentials: Arc<dyn CredentialProvider>,
    unique_sign: bool,
    sign_duration: Duration,
}

/// Result of a successful canonicalization: the string to sign plus the
/// identity it was resolved for.
pub(crate) struct CanonicalRequest {
    pub(crate) canonical: String,
    pub(crate) app_key: AppKey,
    pub(crate) secret: String,
    pub(crate) nonce: Option<String>,
}

impl SignOption {
    /// Create options in unique-sign mode with the default 300 second window.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            credentials,
            unique_sign: true,
            sign_duration: Duration::from_secs(DEFAULT_SIGN_DURATION_SECS),
        }
    }

    /// Build options from the process configuration.
    #[must_use]
    pub fn from_config(config: &SignConfig) -> Self {
        let credentials = StaticCredentialProvider::new(config.app_keys.clone());
        Self::new(Arc::new(credentials))
            .with_unique_sign(config.unique_sign)
            .with_sign_duration(config.sign_duration())
    }

    /// Enable or disable timestamp and nonce participation.
    #[must_use]
    pub fn with_unique_sign(mut self, unique_sign: bool) -> Self {
        self.unique_sign = unique_sign;
        self
    }

    /// Set the freshness window. A zero duration selects the default.
    #[must_use]
    pub fn with_sign_duration(mut self, duration: Duration) -> Self {
        self.sign_duration = if duration.is_zero() {
            Duration::from_secs(DEFAULT_SIGN_DURATION_SECS)
        } else {
            duration
        };
        self
    }

    /// Whether unique-sign mode is enabled.
    #[must_use]
    pub fn unique_sign(&self) -> bool {
        self.unique_sign
    }

    /// The freshness window.
    #[must_use]
    pub fn sign_duration(&self) -> Duration {
        self.sign_duration
    }

    /// Resolve the secret of `app_key`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::WrongAppKey`] for unknown keys or empty secrets.
    pub fn secret_for(&self, app_key: &str) -> Result<String, SignError> {
        let secret = self.credentials.get_secret_key(app_key)?;
        if secret.is_empty() {
            return Err(SignError::WrongAppKey(app_key.to_owned()));
        }
        Ok(secret)
    }

    /// Build the canonical string of `request` as of the current time.
    ///
    /// # Errors
    ///
    /// Returns the [`SignError`] kind of the first failed check.
    pub fn string_to_sign(&self, request: &RequestDescriptor) -> Result<String, SignError> {
        self.string_to_sign_at(request, Utc::now())
    }

    /// Build the canonical string of `request` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`SignError`] kind of the first failed check.
    pub fn string_to_sign_at(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<String, SignError> {
        self.canonicalize_at(request, now).map(|c| c.canonical)
    }

    pub(crate) fn canonicalize_at(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<CanonicalRequest, SignError> {
        let form = request.form.as_ref().ok_or(SignError::NoQueryParam)?;

        let app_key = AppKey::new(form.joined(PARAM_APP_KEY)).map_err(|_| SignError::NoAppKey)?;
        let secret = self.secret_for(app_key.as_str())?;

        let nonce = if self.unique_sign {
            check_timestamp(&form.joined(PARAM_TIMESTAMP), self.sign_duration, now)?;
            let nonce = form.joined(PARAM_NONCE);
            check_nonce(&nonce)?;
            Some(nonce)
        } else {
            None
        };

        let canonical = build_canonical_string(
            &request.path,
            &request.method,
            form,
            request.body.as_deref(),
        );
        debug!(app_key = %app_key, canonical = ?canonical, "built string to sign");

        Ok(CanonicalRequest {
            canonical,
            app_key,
            secret,
            nonce,
        })
    }
}

impl fmt::Debug for SignOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignOption")
            .field("unique_sign", &self.unique_sign)
            .field("sign_duration", &self.sign_duration)
            .finish_non_exhaustive()
    }
}
