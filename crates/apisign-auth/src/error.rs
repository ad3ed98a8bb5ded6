//! Error kinds for signing and verification.
//!
//! Every failure maps to exactly one [`SignError`] variant. Each variant has a
//! stable string identifier ([`SignError::code`]) so embedding applications
//! can report and match on the kind without parsing messages.

use apisign_core::NonceStoreError;

/// Errors that can occur while canonicalizing or verifying a signed request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The request carries no form parameters at all.
    #[error("request has no query or form parameters")]
    NoQueryParam,

    /// The `ak` parameter is missing or empty.
    #[error("missing app key parameter `ak`")]
    NoAppKey,

    /// The `ak` parameter does not name a configured identity.
    #[error("unknown app key: {0}")]
    WrongAppKey(String),

    /// The `ts` parameter is missing (unique-sign mode).
    #[error("missing timestamp parameter `ts`")]
    NoTimestamp,

    /// The `ts` parameter is not a decimal unix timestamp.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The timestamp lies after the verification time.
    #[error("timestamp {0} is in the future")]
    FutureTimestamp(i64),

    /// The timestamp is older than the freshness window.
    #[error("timestamp {0} is outside the freshness window")]
    TsExpired(i64),

    /// The `nc` parameter is shorter than 32 bytes.
    #[error("nonce is {0} bytes long, minimum is 32")]
    NonceTooShort(usize),

    /// The `nc` parameter is longer than 50 bytes.
    #[error("nonce is {0} bytes long, maximum is 50")]
    NonceTooLong(usize),

    /// The `sn` parameter is missing.
    #[error("missing signature parameter `sn`")]
    NoSignature,

    /// The computed signature does not match the supplied one.
    #[error("signature does not match")]
    WrongSign,

    /// The nonce was already accepted within the freshness window.
    #[error("nonce has already been used")]
    NonceExist,

    /// The nonce store could not be consulted.
    #[error("failed to check nonce: {0}")]
    CheckNonce(#[source] NonceStoreError),
}

impl SignError {
    /// Stable identifier of the error kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use apisign_auth::SignError;
    ///
    /// assert_eq!(SignError::WrongSign.code(), "WrongSign");
    /// assert_eq!(SignError::TsExpired(0).code(), "TSExpired");
    /// ```
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoQueryParam => "NoQueryParam",
            Self::NoAppKey => "NoAppKey",
            Self::WrongAppKey(_) => "WrongAppKey",
            Self::NoTimestamp => "NoTimestamp",
            Self::InvalidTimestamp(_) => "InvalidTimestamp",
            Self::FutureTimestamp(_) => "FutureTimestamp",
            Self::TsExpired(_) => "TSExpired",
            Self::NonceTooShort(_) => "NonceTooShort",
            Self::NonceTooLong(_) => "NonceTooLong",
            Self::NoSignature => "NoSignature",
            Self::WrongSign => "WrongSign",
            Self::NonceExist => "NonceExist",
            Self::CheckNonce(_) => "CheckNonce",
        }
    }

    /// Whether the failure comes from infrastructure rather than the request.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::CheckNonce(_))
    }
}
