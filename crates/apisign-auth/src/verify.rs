//! Signature verification with replay protection.
//!
//! Verification runs the same canonicalization as signing, recomputes the
//! signature, compares it in constant time and, in unique-sign mode, records
//! the nonce with an atomic set-if-absent so a second presentation within the
//! freshness window fails with [`SignError::NonceExist`].
//!
//! ```text
//! canonicalize -> resolve secret -> sign -> compare -> [record nonce] -> accept
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use apisign_core::{AppKey, NonceStore, NonceStoreError, SignConfig};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::SignError;
use crate::option::SignOption;
use crate::request::{PARAM_SIGNATURE, RequestDescriptor};
use crate::signer::{sign, signatures_match};

/// Namespace inserted between the key prefix and the nonce.
pub const NONCE_NAMESPACE: &str = "sign_nonce:";

/// Identity of an accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// The caller's app key.
    pub app_key: AppKey,
    /// The recorded nonce, `None` outside unique-sign mode.
    pub nonce: Option<String>,
}

/// Verifier configuration.
///
/// Built once per process and shared across requests; it holds no
/// request-scoped state. All replay state lives in the nonce store.
#[derive(Clone)]
pub struct VerifyOption {
    sign: SignOption,
    nonce_store: Option<Arc<dyn NonceStore>>,
    key_prefix: String,
    nonce_timeout: Option<Duration>,
}

impl VerifyOption {
    /// Create a verifier without a nonce store.
    ///
    /// In unique-sign mode every otherwise valid request then fails with
    /// [`SignError::CheckNonce`] until a store is attached.
    #[must_use]
    pub fn new(sign: SignOption) -> Self {
        Self {
            sign,
            nonce_store: None,
            key_prefix: String::new(),
            nonce_timeout: None,
        }
    }

    /// Build a verifier from the process configuration and a nonce store.
    #[must_use]
    pub fn from_config(config: &SignConfig, nonce_store: Arc<dyn NonceStore>) -> Self {
        let mut option = Self::new(SignOption::from_config(config))
            .with_nonce_store(nonce_store)
            .with_key_prefix(config.nonce_key_prefix.clone());
        option.nonce_timeout = config.nonce_timeout();
        option
    }

    /// Attach the nonce store.
    #[must_use]
    pub fn with_nonce_store(mut self, store: Arc<dyn NonceStore>) -> Self {
        self.nonce_store = Some(store);
        self
    }

    /// Namespace nonce keys with `prefix`.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Bound each nonce store call by `timeout`.
    #[must_use]
    pub fn with_nonce_timeout(mut self, timeout: Duration) -> Self {
        self.nonce_timeout = Some(timeout);
        self
    }

    /// The signing options this verifier checks against.
    #[must_use]
    pub fn sign_option(&self) -> &SignOption {
        &self.sign
    }

    /// The store key recorded for `nonce`: `prefix + "sign_nonce:" + nonce`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use apisign_auth::{SignOption, StaticCredentialProvider, VerifyOption};
    ///
    /// let sign = SignOption::new(Arc::new(StaticCredentialProvider::default()));
    /// let option = VerifyOption::new(sign).with_key_prefix("orders:");
    /// assert_eq!(option.nonce_key("abc"), "orders:sign_nonce:abc");
    /// ```
    #[must_use]
    pub fn nonce_key(&self, nonce: &str) -> String {
        format!("{}{NONCE_NAMESPACE}{nonce}", self.key_prefix)
    }

    /// Verify `request` as of the current time.
    ///
    /// # Errors
    ///
    /// Returns the [`SignError`] kind of the first failed check.
    pub async fn verify(&self, request: &RequestDescriptor) -> Result<Verified, SignError> {
        self.verify_at(request, Utc::now()).await
    }

    /// Verify `request` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`SignError`] kind of the first failed check.
    pub async fn verify_at(
        &self,
        request: &RequestDescriptor,
        now: DateTime<Utc>,
    ) -> Result<Verified, SignError> {
        let canonical = self.sign.canonicalize_at(request, now)?;
        let expected = sign(&canonical.canonical, &canonical.secret);

        let provided = request
            .form
            .as_ref()
            .map(|form| form.joined(PARAM_SIGNATURE))
            .unwrap_or_default();
        if provided.is_empty() {
            debug!(app_key = %canonical.app_key, "request carries no signature");
            return Err(SignError::NoSignature);
        }
        if !signatures_match(&provided, &expected) {
            debug!(app_key = %canonical.app_key, "signature mismatch");
            return Err(SignError::WrongSign);
        }

        if let Some(nonce) = &canonical.nonce {
            self.record_nonce(nonce).await?;
        }

        debug!(app_key = %canonical.app_key, path = %request.path, "signature verified");
        Ok(Verified {
            app_key: canonical.app_key,
            nonce: canonical.nonce,
        })
    }

    async fn record_nonce(&self, nonce: &str) -> Result<(), SignError> {
        let Some(store) = &self.nonce_store else {
            warn!("unique sign enabled but no nonce store configured");
            return Err(SignError::CheckNonce(NonceStoreError::NotConfigured));
        };

        let key = self.nonce_key(nonce);
        let ttl = self.sign.sign_duration();
        let outcome = match self.nonce_timeout {
            Some(limit) => tokio::time::timeout(limit, store.set_if_absent(&key, ttl))
                .await
                .unwrap_or(Err(NonceStoreError::Timeout(limit))),
            None => store.set_if_absent(&key, ttl).await,
        };

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(key = %key, "nonce replayed");
                Err(SignError::NonceExist)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "nonce store check failed");
                Err(SignError::CheckNonce(e))
            }
        }
    }
}

impl fmt::Debug for VerifyOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyOption")
            .field("sign", &self.sign)
            .field("nonce_store", &self.nonce_store.as_ref().map(|_| "..."))
            .field("key_prefix", &self.key_prefix)
            .field("nonce_timeout", &self.nonce_timeout)
            .finish()
    }
}
