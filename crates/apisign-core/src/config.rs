//! Signing and verification configuration.
//!
//! All configuration is driven by environment variables. The identity mapping
//! (app key to secret) is supplied at startup and never persisted.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{ApiSignError, ApiSignResult};
use crate::types::AppKey;

/// Default freshness window for signed timestamps, in seconds.
pub const DEFAULT_SIGN_DURATION_SECS: u64 = 300;

/// Process-wide signing configuration.
///
/// Built once at startup and turned into sign/verify options by the auth
/// crate. Secrets are never serialized and are redacted from `Debug` output.
///
/// # Examples
///
/// ```
/// use apisign_core::SignConfig;
///
/// let config = SignConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert!(config.unique_sign);
/// assert_eq!(config.sign_duration_secs, 300);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SignConfig {
    /// Bind address for the gateway (e.g. `"0.0.0.0:8080"`).
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub gateway_listen: String,

    /// Mapping of app key to app secret.
    #[builder(default)]
    #[serde(default, skip_serializing)]
    pub app_keys: BTreeMap<String, String>,

    /// Whether `ts` and `nc` take part in signing and replay protection.
    #[builder(default = true)]
    pub unique_sign: bool,

    /// Freshness window for `ts`, in seconds. Zero selects the default.
    #[builder(default = DEFAULT_SIGN_DURATION_SECS)]
    pub sign_duration_secs: u64,

    /// Namespace prepended to every nonce key in the store.
    #[builder(default)]
    pub nonce_key_prefix: String,

    /// Upper bound on a single nonce store round trip, in milliseconds.
    #[builder(default = Some(1_000))]
    pub nonce_timeout_ms: Option<u64>,

    /// Redis connection URL. When unset an in-memory nonce store is used.
    #[builder(default)]
    pub redis_url: Option<String>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:8080"),
            app_keys: BTreeMap::new(),
            unique_sign: true,
            sign_duration_secs: DEFAULT_SIGN_DURATION_SECS,
            nonce_key_prefix: String::new(),
            nonce_timeout_ms: Some(1_000),
            redis_url: None,
            log_level: String::from("info"),
        }
    }
}

impl fmt::Debug for SignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("app_keys", &self.app_keys.keys().collect::<Vec<_>>())
            .field("unique_sign", &self.unique_sign)
            .field("sign_duration_secs", &self.sign_duration_secs)
            .field("nonce_key_prefix", &self.nonce_key_prefix)
            .field("nonce_timeout_ms", &self.nonce_timeout_ms)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "..."))
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl SignConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `APISIGN_APP_KEYS` | *(empty)*, format `ak1:secret1,ak2:secret2` |
    /// | `APISIGN_UNIQUE_SIGN` | `true` |
    /// | `APISIGN_SIGN_DURATION` | `300` (seconds) |
    /// | `APISIGN_NONCE_PREFIX` | *(empty)* |
    /// | `APISIGN_NONCE_TIMEOUT_MS` | `1000`, `0` disables the timeout |
    /// | `APISIGN_REDIS_URL` | *(unset)* |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    /// Returns [`ApiSignError::Config`] when a variable is present but malformed.
    pub fn from_env() -> ApiSignResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("APISIGN_APP_KEYS") {
            config.app_keys = parse_app_keys(&v)?;
        }
        if let Ok(v) = std::env::var("APISIGN_UNIQUE_SIGN") {
            config.unique_sign = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("APISIGN_SIGN_DURATION") {
            config.sign_duration_secs = parse_u64("APISIGN_SIGN_DURATION", &v)?;
        }
        if let Ok(v) = std::env::var("APISIGN_NONCE_PREFIX") {
            config.nonce_key_prefix = v;
        }
        if let Ok(v) = std::env::var("APISIGN_NONCE_TIMEOUT_MS") {
            let ms = parse_u64("APISIGN_NONCE_TIMEOUT_MS", &v)?;
            config.nonce_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Ok(v) = std::env::var("APISIGN_REDIS_URL") {
            if !v.trim().is_empty() {
                config.redis_url = Some(v);
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// The freshness window, with zero mapped to the 300 second default.
    #[must_use]
    pub fn sign_duration(&self) -> Duration {
        if self.sign_duration_secs == 0 {
            Duration::from_secs(DEFAULT_SIGN_DURATION_SECS)
        } else {
            Duration::from_secs(self.sign_duration_secs)
        }
    }

    /// The nonce store timeout, if any.
    #[must_use]
    pub fn nonce_timeout(&self) -> Option<Duration> {
        self.nonce_timeout_ms.map(Duration::from_millis)
    }
}

/// Parse an `ak1:secret1,ak2:secret2` list into a mapping.
///
/// Entries are trimmed and empty entries are skipped. The secret is everything
/// after the first `:`, so secrets may themselves contain `:` or `=`.
fn parse_app_keys(raw: &str) -> ApiSignResult<BTreeMap<String, String>> {
    let mut keys = BTreeMap::new();
    for (index, entry) in raw.split(',').map(str::trim).filter(|e| !e.is_empty()).enumerate() {
        let (key, secret) = entry.split_once(':').ok_or_else(|| {
            ApiSignError::Config(format!("APISIGN_APP_KEYS entry #{index} has no ':' separator"))
        })?;
        let key = AppKey::new(key.trim())?;
        if key.as_str().chars().any(char::is_whitespace) {
            return Err(ApiSignError::InvalidAppKey(key.to_string()));
        }
        if secret.is_empty() {
            return Err(ApiSignError::Config(format!("empty secret for app key {key}")));
        }
        keys.insert(key.as_str().to_owned(), secret.to_owned());
    }
    Ok(keys)
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_u64(name: &str, value: &str) -> ApiSignResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ApiSignError::Config(format!("{name}={value:?} is not a valid integer: {e}")))
}
