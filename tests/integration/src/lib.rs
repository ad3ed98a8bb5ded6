//! Integration tests for the apisign gateway.
//!
//! Each test starts a gateway in-process on `127.0.0.1:0` and talks to it over
//! real HTTP with `reqwest`. Tests that need a Redis server are marked
//! `#[ignore]`; run them with:
//!
//! ```text
//! APISIGN_REDIS_URL=redis://127.0.0.1:6379/ cargo test -p apisign-integration -- --ignored
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Once};

use apisign_auth::{SignOption, VerifyOption};
use apisign_core::{MemoryNonceStore, NonceStore, SignConfig};
use apisign_http::{EchoHandler, SignedHttpService};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// App key configured on every test gateway.
pub const APP_KEY: &str = "testAppKey";
/// Secret of [`APP_KEY`].
pub const APP_SECRET: &str = "testAppSecret";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Configuration with the test identity and the given unique-sign mode.
#[must_use]
pub fn test_config(unique_sign: bool) -> SignConfig {
    SignConfig::builder()
        .gateway_listen("127.0.0.1:0".into())
        .app_keys(BTreeMap::from([(APP_KEY.to_owned(), APP_SECRET.to_owned())]))
        .unique_sign(unique_sign)
        .nonce_key_prefix("it:".into())
        .build()
}

/// A gateway running in the background of the current test runtime.
///
/// Dropping it triggers a graceful shutdown.
#[derive(Debug)]
pub struct TestGateway {
    addr: SocketAddr,
    sign: SignOption,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestGateway {
    /// Start a gateway backed by an in-memory nonce store.
    ///
    /// # Errors
    /// Fails when the listener cannot be bound.
    pub async fn start(config: &SignConfig) -> anyhow::Result<Self> {
        Self::start_with_store(config, Arc::new(MemoryNonceStore::new())).await
    }

    /// Start a gateway backed by `store`.
    ///
    /// # Errors
    /// Fails when the listener cannot be bound.
    pub async fn start_with_store(
        config: &SignConfig,
        store: Arc<dyn NonceStore>,
    ) -> anyhow::Result<Self> {
        init_tracing();

        let listener = TcpListener::bind(config.gateway_listen.as_str()).await?;
        let addr = listener.local_addr()?;

        let verifier = VerifyOption::from_config(config, store);
        let sign = verifier.sign_option().clone();
        let service = SignedHttpService::new(Arc::new(EchoHandler), verifier);

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(apisign_http::serve(listener, service, async {
            rx.await.ok();
        }));

        Ok(Self {
            addr,
            sign,
            shutdown: Some(tx),
        })
    }

    /// Absolute URL for a path (with optional query string).
    #[must_use]
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    /// Signing options matching the gateway's verifier.
    #[must_use]
    pub fn sign_option(&self) -> &SignOption {
        &self.sign
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// HTTP client for talking to a test gateway.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

mod test_gateway;
mod test_redis;
