//! Core types, configuration, and nonce storage for apisign.
//!
//! This crate provides the building blocks shared by the signing, Redis and
//! HTTP crates: the environment-driven [`SignConfig`], the infrastructure
//! error types, the [`AppKey`] caller identifier, and the [`NonceStore`]
//! contract together with its in-memory implementation.

mod config;
mod error;
mod nonce;
mod types;

pub use config::{DEFAULT_SIGN_DURATION_SECS, SignConfig};
pub use error::{ApiSignError, ApiSignResult, NonceStoreError};
pub use nonce::{MemoryNonceStore, NonceStore};
pub use types::AppKey;
