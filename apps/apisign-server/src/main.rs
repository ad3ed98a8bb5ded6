//! apisign server - signature-checking HTTP gateway.
//!
//! Every request except the health probes must carry a valid `ak`/`sn`
//! signature (plus `ts`/`nc` in unique-sign mode). Accepted requests are
//! answered by the echo handler with a JSON description of the request.
//!
//! # Usage
//!
//! ```text
//! APISIGN_APP_KEYS=testAppKey:testAppSecret apisign-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `APISIGN_APP_KEYS` | *(empty)* | `ak1:secret1,ak2:secret2` |
//! | `APISIGN_UNIQUE_SIGN` | `true` | Require `ts`/`nc` and reject replays |
//! | `APISIGN_SIGN_DURATION` | `300` | Freshness window in seconds |
//! | `APISIGN_NONCE_PREFIX` | *(empty)* | Namespace for nonce keys |
//! | `APISIGN_NONCE_TIMEOUT_MS` | `1000` | Nonce store timeout, `0` disables |
//! | `APISIGN_REDIS_URL` | *(unset)* | Redis nonce store; in-memory when unset |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use apisign_auth::VerifyOption;
use apisign_core::{MemoryNonceStore, NonceStore, SignConfig};
use apisign_http::{EchoHandler, SignedHttpService};
use apisign_redis::RedisNonceStore;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often expired entries are dropped from the in-memory nonce store.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound for the `--health-check` probe.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Install the log subscriber. A valid `RUST_LOG` wins over `LOG_LEVEL`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("LOG_LEVEL={log_level:?} is not a valid filter"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Build the nonce store: Redis when configured, in-memory otherwise.
async fn build_nonce_store(config: &SignConfig) -> Result<Arc<dyn NonceStore>> {
    if let Some(url) = &config.redis_url {
        let store = RedisNonceStore::connect(url)
            .await
            .context("failed to initialize redis nonce store")?;
        let store: Arc<dyn NonceStore> = Arc::new(store);
        return Ok(store);
    }

    if config.unique_sign {
        warn!("APISIGN_REDIS_URL not set, nonces are only tracked within this process");
    }
    let store = Arc::new(MemoryNonceStore::new());
    spawn_purge_task(Arc::clone(&store));
    let store: Arc<dyn NonceStore> = store;
    Ok(store)
}

/// Periodically drop expired nonces so the in-memory store stays bounded.
fn spawn_purge_task(store: Arc<MemoryNonceStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = store.len(), "purged expired nonces");
            }
        }
    });
}

/// Probe a running gateway's unsigned `GET /health` endpoint.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let probe = async {
        let mut stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("gateway not reachable at {addr}"))?;
        let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        anyhow::Ok(String::from_utf8_lossy(&raw).into_owned())
    };

    let response = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
        .await
        .with_context(|| format!("health probe to {addr} timed out"))??;

    anyhow::ensure!(
        reports_running(&response),
        "gateway at {addr} is not healthy"
    );
    Ok(())
}

/// Whether a raw HTTP response is a `200` carrying `{"status":"running"}`.
fn reports_running(response: &str) -> bool {
    let status_ok = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        == Some("200");
    let body = response.split_once("\r\n\r\n").map_or("", |(_, body)| body);
    status_ok && body.contains(r#""status":"running""#)
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = SignConfig::from_env().context("invalid configuration")?;

    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    if config.app_keys.is_empty() {
        warn!("APISIGN_APP_KEYS is empty, every signed request will be rejected");
    }

    let nonce_store = build_nonce_store(&config).await?;
    let verifier = VerifyOption::from_config(&config, nonce_store);
    let service = SignedHttpService::new(Arc::new(EchoHandler), verifier);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        app_keys = config.app_keys.len(),
        unique_sign = config.unique_sign,
        sign_duration_secs = config.sign_duration().as_secs(),
        redis = config.redis_url.is_some(),
        version = VERSION,
        "starting apisign server",
    );

    apisign_http::serve(listener, service, shutdown_signal()).await;
    info!("exiting");

    Ok(())
}
