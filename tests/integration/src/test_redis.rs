//! Gateway tests backed by a real Redis nonce store.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use apisign_auth::RequestDescriptor;
    use apisign_core::NonceStore;
    use apisign_redis::RedisNonceStore;
    use serde_json::Value;

    use crate::{APP_KEY, TestGateway, client, test_config};

    async fn redis_store() -> Arc<dyn NonceStore> {
        let url = std::env::var("APISIGN_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_owned());
        let store = RedisNonceStore::connect(&url)
            .await
            .expect("redis should be reachable");
        Arc::new(store)
    }

    #[tokio::test]
    #[ignore = "requires running redis"]
    async fn test_should_reject_replay_across_gateways() {
        let config = test_config(true);
        let first = TestGateway::start_with_store(&config, redis_store().await)
            .await
            .unwrap();
        let second = TestGateway::start_with_store(&config, redis_store().await)
            .await
            .unwrap();

        let signed = first
            .sign_option()
            .sign_request(RequestDescriptor::new("/v1/orders", http::Method::GET), APP_KEY)
            .unwrap();

        let resp = client().get(first.url(&signed.uri)).send().await.unwrap();
        assert_eq!(resp.status(), 200);

        // The nonce is shared through redis, so the second gateway sees it too.
        let resp = client().get(second.url(&signed.uri)).send().await.unwrap();
        assert_eq!(resp.status(), 409);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "NonceExist");
    }

    #[tokio::test]
    #[ignore = "requires running redis"]
    async fn test_should_accept_fresh_nonces_with_redis() {
        let gateway = TestGateway::start_with_store(&test_config(true), redis_store().await)
            .await
            .unwrap();

        for _ in 0..5 {
            let signed = gateway
                .sign_option()
                .sign_request(RequestDescriptor::new("/v1/orders", http::Method::GET), APP_KEY)
                .unwrap();
            let resp = client().get(gateway.url(&signed.uri)).send().await.unwrap();
            assert_eq!(resp.status(), 200);
        }
    }
}
