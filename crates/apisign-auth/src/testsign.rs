//! Self-consistent signed requests for tests and clients.
//!
//! The helper fills in the reserved parameters, runs exactly the same
//! canonicalization as the verifier and attaches the signature, so its output
//! always verifies under the same options.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SignError;
use crate::option::SignOption;
use crate::request::{
    PARAM_APP_KEY, PARAM_NONCE, PARAM_SIGNATURE, PARAM_TIMESTAMP, Params, RequestDescriptor,
};
use crate::signer::sign;

/// A request carrying every parameter needed to pass verification.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// The computed signature (also present in `form` as `sn`).
    pub signature: String,
    /// The signed form, including `ak`, `sn` and in unique-sign mode `ts`/`nc`.
    pub form: Params,
    /// `path + "?" + urlencoded form`.
    pub uri: String,
    /// The original descriptor with the signed form attached.
    pub request: RequestDescriptor,
}

impl SignOption {
    /// Sign `request` as `app_key` at the current time.
    ///
    /// # Errors
    ///
    /// Returns a [`SignError`] when canonicalization fails, for example for an
    /// unknown app key.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use apisign_auth::{RequestDescriptor, SignOption, StaticCredentialProvider};
    ///
    /// let credentials =
    ///     StaticCredentialProvider::new(vec![("ak1".to_owned(), "secret1".to_owned())]);
    /// let option = SignOption::new(Arc::new(credentials));
    ///
    /// let signed = option
    ///     .sign_request(RequestDescriptor::new("/v1/items", http::Method::GET), "ak1")
    ///     .unwrap();
    /// assert!(signed.uri.starts_with("/v1/items?ak=ak1&nc="));
    /// assert_eq!(signed.form.get("sn"), Some(signed.signature.as_str()));
    /// ```
    pub fn sign_request(
        &self,
        request: RequestDescriptor,
        app_key: &str,
    ) -> Result<SignedRequest, SignError> {
        self.sign_request_at(request, app_key, Utc::now())
    }

    /// Sign `request` as `app_key` with `now` as the timestamp.
    ///
    /// # Errors
    ///
    /// Returns a [`SignError`] when canonicalization fails.
    pub fn sign_request_at(
        &self,
        mut request: RequestDescriptor,
        app_key: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedRequest, SignError> {
        let mut form = request.form.take().unwrap_or_default();
        form.remove(PARAM_SIGNATURE);
        form.set(PARAM_APP_KEY, app_key);

        if self.unique_sign() {
            form.set(PARAM_TIMESTAMP, now.timestamp().to_string());
            form.set(PARAM_NONCE, Uuid::new_v4().to_string());
        }

        request.form = Some(form);
        let canonical = self.canonicalize_at(&request, now)?;
        let signature = sign(&canonical.canonical, &canonical.secret);

        let mut form = request.form.take().unwrap_or_default();
        form.set(PARAM_SIGNATURE, signature.clone());
        request.form = Some(form.clone());

        let uri = format!("{}?{}", request.path, form.encode());

        Ok(SignedRequest {
            signature,
            form,
            uri,
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::credentials::StaticCredentialProvider;

    fn option() -> SignOption {
        let credentials = StaticCredentialProvider::new(vec![(
            "testAppKey".to_owned(),
            "testAppSecret".to_owned(),
        )]);
        SignOption::new(Arc::new(credentials))
    }

    #[test]
    fn test_should_sign_round_trip_example() {
        let option = option().with_unique_sign(false);
        let signed = option
            .sign_request(
                RequestDescriptor::new("/v1/articles/15", http::Method::GET),
                "testAppKey",
            )
            .unwrap();

        assert_eq!(signed.signature, "gAz/q/sOOP8Lo6D5ku8gCmI9Jf3eXIdhilIbzAU+/Hc=");
        assert_eq!(
            signed.uri,
            "/v1/articles/15?ak=testAppKey&sn=gAz%2Fq%2FsOOP8Lo6D5ku8gCmI9Jf3eXIdhilIbzAU%2B%2FHc%3D"
        );
    }

    #[test]
    fn test_should_add_timestamp_and_uuid_nonce_in_unique_mode() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let signed = option()
            .sign_request_at(
                RequestDescriptor::new("/v1/items", http::Method::GET),
                "testAppKey",
                now,
            )
            .unwrap();

        assert_eq!(signed.form.get("ts"), Some("1700000000"));
        let nonce = signed.form.get("nc").unwrap();
        assert_eq!(nonce.len(), 36);
        assert!(Uuid::parse_str(nonce).is_ok());
    }

    #[test]
    fn test_should_generate_distinct_nonces() {
        let first = option()
            .sign_request(RequestDescriptor::new("/p", http::Method::GET), "testAppKey")
            .unwrap();
        let second = option()
            .sign_request(RequestDescriptor::new("/p", http::Method::GET), "testAppKey")
            .unwrap();
        assert_ne!(first.form.get("nc"), second.form.get("nc"));
        assert_ne!(first.signature, second.signature);
    }

    #[test]
    fn test_should_replace_stale_signature_and_app_key() {
        let form: Params = [("ak", "old"), ("sn", "stale"), ("page", "2")]
            .into_iter()
            .collect();
        let signed = option()
            .with_unique_sign(false)
            .sign_request(
                RequestDescriptor::new("/p", http::Method::GET).with_form(form),
                "testAppKey",
            )
            .unwrap();

        assert_eq!(signed.form.values("ak"), ["testAppKey"]);
        assert_eq!(signed.form.values("sn"), [signed.signature.clone()]);
        assert_eq!(signed.form.get("page"), Some("2"));
    }

    #[test]
    fn test_should_fail_for_unknown_app_key() {
        let result =
            option().sign_request(RequestDescriptor::new("/p", http::Method::GET), "nobody");
        assert!(matches!(result, Err(SignError::WrongAppKey(_))));
    }

    #[test]
    fn test_should_keep_body_for_verification() {
        let signed = option()
            .sign_request(
                RequestDescriptor::new("/p", http::Method::POST).with_body(&b"{}"[..]),
                "testAppKey",
            )
            .unwrap();
        assert_eq!(signed.request.body.as_deref(), Some(&b"{}"[..]));
        assert_eq!(signed.request.form.as_ref(), Some(&signed.form));
    }
}
