//! Request signing and anti-replay verification for apisign.
//!
//! A caller identified by an app key (`ak`) signs a request by building a
//! canonical string from its path, form parameters and (for body-bearing
//! methods) a digest of its body, then computing
//! `base64(HMAC-SHA256(secret, canonical))` and sending it as `sn`. The
//! verifier rebuilds the canonical string, compares signatures in constant
//! time and, in unique-sign mode, checks the timestamp (`ts`) against a
//! freshness window and records the nonce (`nc`) in a [`NonceStore`] so the
//! same request cannot be replayed.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use apisign_auth::{Params, RequestDescriptor, SignOption, StaticCredentialProvider};
//!
//! let credentials = StaticCredentialProvider::new(vec![(
//!     "testAppKey".to_owned(),
//!     "testAppSecret".to_owned(),
//! )]);
//! let option = SignOption::new(Arc::new(credentials)).with_unique_sign(false);
//!
//! let mut form = Params::new();
//! form.add("ak", "testAppKey");
//! let request = RequestDescriptor::new("/v1/articles/15", http::Method::GET).with_form(form);
//!
//! let canonical = option.string_to_sign(&request).unwrap();
//! assert_eq!(canonical, "/v1/articles/15\nak=testAppKey");
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical string construction
//! - [`credentials`] - Credential provider trait and in-memory implementation
//! - [`error`] - Signature error kinds
//! - [`freshness`] - Timestamp window and nonce length checks
//! - [`option`] - Signing options and canonicalization entry point
//! - [`partner`] - Partner-compatible `&key=` signing variants
//! - [`request`] - Request descriptor and multi-valued form parameters
//! - [`signer`] - HMAC-SHA256 signing and constant-time comparison
//! - [`testsign`] - Self-consistent signed requests for tests and clients
//! - [`verify`] - Verification options and the verifier
//!
//! [`NonceStore`]: apisign_core::NonceStore

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod freshness;
pub mod option;
pub mod partner;
pub mod request;
pub mod signer;
pub mod testsign;
pub mod verify;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::SignError;
pub use option::SignOption;
pub use request::{Params, RequestDescriptor};
pub use signer::sign;
pub use testsign::SignedRequest;
pub use verify::{Verified, VerifyOption};
