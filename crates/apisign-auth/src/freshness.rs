//! Timestamp freshness window and nonce length bounds.
//!
//! In unique-sign mode a request carries `ts` (unix seconds) and `nc` (a
//! one-time token). The timestamp must not lie in the future and must be
//! within the freshness window: `ts + window >= now`. The nonce length is
//! measured in bytes.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::SignError;

/// Minimum accepted nonce length in bytes.
pub const MIN_NONCE_LEN: usize = 32;
/// Maximum accepted nonce length in bytes.
pub const MAX_NONCE_LEN: usize = 50;

/// Validate a raw `ts` value against `now` and the freshness window.
///
/// Returns the parsed timestamp in unix seconds.
///
/// # Errors
///
/// - [`SignError::NoTimestamp`] when `raw` is empty
/// - [`SignError::InvalidTimestamp`] when it is not a representable decimal timestamp
/// - [`SignError::FutureTimestamp`] when it lies after `now`
/// - [`SignError::TsExpired`] when it is older than `now - window`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use apisign_auth::freshness::check_timestamp;
///
/// let now = chrono::DateTime::from_timestamp(1_700_000_300, 0).unwrap();
/// let window = Duration::from_secs(300);
/// assert_eq!(check_timestamp("1700000000", window, now).unwrap(), 1_700_000_000);
/// assert!(check_timestamp("1699999999", window, now).is_err());
/// ```
pub fn check_timestamp(raw: &str, window: Duration, now: DateTime<Utc>) -> Result<i64, SignError> {
    if raw.is_empty() {
        return Err(SignError::NoTimestamp);
    }

    let ts: i64 = raw
        .parse()
        .map_err(|_| SignError::InvalidTimestamp(raw.to_owned()))?;
    let signed_at =
        DateTime::from_timestamp(ts, 0).ok_or_else(|| SignError::InvalidTimestamp(raw.to_owned()))?;

    if signed_at > now {
        return Err(SignError::FutureTimestamp(ts));
    }

    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
    let expired = signed_at
        .checked_add_signed(window)
        .is_some_and(|deadline| deadline < now);
    if expired {
        return Err(SignError::TsExpired(ts));
    }

    Ok(ts)
}

/// Validate the byte length of a nonce.
///
/// # Errors
///
/// Returns [`SignError::NonceTooShort`] below [`MIN_NONCE_LEN`] bytes (an
/// absent nonce is empty) and [`SignError::NonceTooLong`] above
/// [`MAX_NONCE_LEN`] bytes.
pub fn check_nonce(nonce: &str) -> Result<(), SignError> {
    let len = nonce.len();
    if len < MIN_NONCE_LEN {
        return Err(SignError::NonceTooShort(len));
    }
    if len > MAX_NONCE_LEN {
        return Err(SignError::NonceTooLong(len));
    }
    Ok(())
}
