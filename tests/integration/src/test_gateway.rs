//! Gateway integration tests over real HTTP.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use apisign_auth::{RequestDescriptor, SignOption, StaticCredentialProvider};
    use chrono::{Duration as TimeDelta, Utc};
    use serde_json::Value;

    use crate::{APP_KEY, TestGateway, client, test_config};

    fn signed_get(option: &SignOption, path: &str) -> String {
        option
            .sign_request(RequestDescriptor::new(path, http::Method::GET), APP_KEY)
            .expect("signing succeeds")
            .uri
    }

    #[tokio::test]
    async fn test_should_serve_health_without_signature() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();

        let resp = client().get(gateway.url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().contains_key("x-request-id"));
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    async fn test_should_accept_round_trip_without_unique_sign() {
        let gateway = TestGateway::start(&test_config(false)).await.unwrap();
        let uri = signed_get(gateway.sign_option(), "/v1/articles/15");

        let resp = client().get(gateway.url(&uri)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["appKey"], APP_KEY);
        assert_eq!(json["path"], "/v1/articles/15");
        assert!(json["nonce"].is_null());

        // Without unique sign the same request may be repeated.
        let again = client().get(gateway.url(&uri)).send().await.unwrap();
        assert_eq!(again.status(), 200);
    }

    #[tokio::test]
    async fn test_should_reject_replayed_request() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();
        let uri = signed_get(gateway.sign_option(), "/v1/orders");

        let first = client().get(gateway.url(&uri)).send().await.unwrap();
        assert_eq!(first.status(), 200);

        let replay = client().get(gateway.url(&uri)).send().await.unwrap();
        assert_eq!(replay.status(), 409);
        let json: Value = replay.json().await.unwrap();
        assert_eq!(json["code"], "NonceExist");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_accept_one_of_concurrent_replays() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();
        let url = gateway.url(&signed_get(gateway.sign_option(), "/v1/payments"));
        let client = client();

        let requests = (0..16).map(|_| client.get(&url).send());
        let statuses: Vec<u16> = futures::future::join_all(requests)
            .await
            .into_iter()
            .map(|r| r.expect("request sent").status().as_u16())
            .collect();

        assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 15);
    }

    #[tokio::test]
    async fn test_should_reject_missing_and_wrong_signatures() {
        let gateway = TestGateway::start(&test_config(false)).await.unwrap();

        let resp = client()
            .get(gateway.url("/v1/articles?ak=testAppKey"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "NoSignature");

        let resp = client()
            .get(gateway.url("/v1/articles?ak=testAppKey&sn=bm90LWEtc2lnbmF0dXJl"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "WrongSign");

        let resp = client().get(gateway.url("/v1/articles")).send().await.unwrap();
        assert_eq!(resp.status(), 401);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "NoAppKey");
    }

    #[tokio::test]
    async fn test_should_reject_unknown_app_key() {
        let gateway = TestGateway::start(&test_config(false)).await.unwrap();
        let stranger = SignOption::new(Arc::new(StaticCredentialProvider::new(vec![(
            "stranger".to_owned(),
            "secret".to_owned(),
        )])))
        .with_unique_sign(false);

        let uri = stranger
            .sign_request(RequestDescriptor::new("/v1/articles", http::Method::GET), "stranger")
            .unwrap()
            .uri;
        let resp = client().get(gateway.url(&uri)).send().await.unwrap();
        assert_eq!(resp.status(), 401);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "WrongAppKey");
    }

    #[tokio::test]
    async fn test_should_reject_expired_and_future_timestamps() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();
        let resp = client()
            .get(gateway.url(
                "/v1/articles?ak=testAppKey&ts=1000&nc=0123456789abcdef0123456789abcdef&sn=x",
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "TSExpired");

        let future = (Utc::now() + TimeDelta::seconds(3_600)).timestamp();
        let resp = client()
            .get(gateway.url(&format!(
                "/v1/articles?ak=testAppKey&ts={future}&nc=0123456789abcdef0123456789abcdef&sn=x"
            )))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "FutureTimestamp");
    }

    #[tokio::test]
    async fn test_should_reject_malformed_nonce() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();
        let now = Utc::now().timestamp();

        let resp = client()
            .get(gateway.url(&format!("/v1/articles?ak=testAppKey&ts={now}&nc=short&sn=x")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["code"], "NonceTooShort");
    }

    #[tokio::test]
    async fn test_should_verify_json_body() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();
        let body = r#"{"title":"hello","tags":["a","b"]}"#;

        let signed = gateway
            .sign_option()
            .sign_request(
                RequestDescriptor::new("/v1/articles", http::Method::POST).with_body(body),
                APP_KEY,
            )
            .unwrap();

        let resp = client()
            .post(gateway.url(&signed.uri))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["bodyLength"], body.len());

        let signed = gateway
            .sign_option()
            .sign_request(
                RequestDescriptor::new("/v1/articles", http::Method::POST).with_body(body),
                APP_KEY,
            )
            .unwrap();
        let resp = client()
            .post(gateway.url(&signed.uri))
            .header("content-type", "application/json")
            .body(r#"{"title":"hellO","tags":["a","b"]}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn test_should_verify_urlencoded_body_parameters() {
        let gateway = TestGateway::start(&test_config(true)).await.unwrap();
        let body = "title=hello+world&tag=b&tag=a";

        let mut form = apisign_auth::Params::from_query(body);
        form.add("page", "1");
        let signed = gateway
            .sign_option()
            .sign_request(
                RequestDescriptor::new("/v1/articles", http::Method::PUT)
                    .with_form(form)
                    .with_body(body),
                APP_KEY,
            )
            .unwrap();

        let mut query = signed.form.clone();
        query.remove("title");
        query.remove("tag");
        let uri = format!("/v1/articles?{}", query.encode());

        let resp = client()
            .put(gateway.url(&uri))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["form"]["title"][0], "hello world");
        assert_eq!(json["form"]["page"][0], "1");
    }
}
