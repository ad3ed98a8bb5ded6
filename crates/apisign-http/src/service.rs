//! Hyper `Service` that verifies every request before dispatching it.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use apisign_auth::{RequestDescriptor, VerifyOption};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use tracing::{debug, info};

use crate::dispatch::SignedHandler;
use crate::response::{
    CONTENT_TYPE, GatewayBody, REQUEST_ID_HEADER, error_response, sign_error_response,
};

/// Hyper `Service` implementation for signed APIs.
///
/// Wraps a [`SignedHandler`] and a [`VerifyOption`]. Health probes are answered
/// directly; every other request is verified and only then handed to the
/// handler.
pub struct SignedHttpService<H: SignedHandler> {
    handler: Arc<H>,
    verifier: Arc<VerifyOption>,
}

impl<H: SignedHandler> SignedHttpService<H> {
    /// Create a new `SignedHttpService`.
    pub fn new(handler: Arc<H>, verifier: VerifyOption) -> Self {
        Self {
            handler,
            verifier: Arc::new(verifier),
        }
    }

    /// Run one request through health check, verification and dispatch.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<GatewayBody>
    where
        B: Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = if is_health_check(req.method(), req.uri().path()) {
            health_check_response()
        } else {
            process_request(req, self.handler.as_ref(), &self.verifier, &request_id).await
        };
        add_common_headers(response, &request_id)
    }
}

impl<H: SignedHandler> Clone for SignedHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<H: SignedHandler> fmt::Debug for SignedHttpService<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedHttpService")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl<H: SignedHandler> hyper::service::Service<http::Request<Incoming>> for SignedHttpService<H> {
    type Response = http::Response<GatewayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

async fn process_request<B, H>(
    req: http::Request<B>,
    handler: &H,
    verifier: &VerifyOption,
    request_id: &str,
) -> http::Response<GatewayBody>
where
    B: Body<Data = Bytes>,
    B::Error: fmt::Display,
    H: SignedHandler,
{
    let (parts, incoming) = req.into_parts();

    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(
                http::StatusCode::BAD_REQUEST,
                "InvalidBody",
                &format!("failed to read request body: {e}"),
                request_id,
            );
        }
    };

    let descriptor = RequestDescriptor::from_parts(&parts, body);
    match verifier.verify(&descriptor).await {
        Ok(verified) => {
            debug!(
                request_id,
                app_key = %verified.app_key,
                method = %parts.method,
                path = %descriptor.path,
                "dispatching verified request"
            );
            handler.handle(verified, parts, descriptor).await
        }
        Err(err) => {
            info!(
                request_id,
                code = err.code(),
                method = %parts.method,
                path = %descriptor.path,
                "rejected request"
            );
            sign_error_response(&err, request_id)
        }
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

fn health_check_response() -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(Full::new(Bytes::from_static(br#"{"status":"running"}"#)))
        .expect("static health response should be valid")
}

fn add_common_headers(
    mut response: http::Response<GatewayBody>,
    request_id: &str,
) -> http::Response<GatewayBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    headers.insert(http::header::SERVER, http::HeaderValue::from_static("apisign"));

    response
}
