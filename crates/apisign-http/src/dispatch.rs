//! Handler trait for verified requests and the echo handler.

use std::future::Future;
use std::pin::Pin;

use apisign_auth::{RequestDescriptor, Verified};

use crate::response::{GatewayBody, json_response};

/// Boxed response future returned by [`SignedHandler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<GatewayBody>> + Send>>;

/// Business logic behind the gateway.
///
/// The handler only ever sees requests that passed verification. It receives
/// the caller identity, the request parts and the descriptor that was
/// verified (form parameters and raw body).
pub trait SignedHandler: Send + Sync + 'static {
    /// Handle a verified request and produce an HTTP response.
    fn handle(
        &self,
        verified: Verified,
        parts: http::request::Parts,
        request: RequestDescriptor,
    ) -> HandlerFuture;
}

/// Handler that answers with a JSON description of the verified request.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler;

impl SignedHandler for EchoHandler {
    fn handle(
        &self,
        verified: Verified,
        parts: http::request::Parts,
        request: RequestDescriptor,
    ) -> HandlerFuture {
        Box::pin(async move {
            let form: serde_json::Map<String, serde_json::Value> = request
                .form
                .iter()
                .flat_map(|form| form.iter())
                .map(|(name, values)| (name.to_owned(), serde_json::json!(values)))
                .collect();

            let json = serde_json::to_vec(&serde_json::json!({
                "appKey": verified.app_key.as_str(),
                "nonce": verified.nonce,
                "method": parts.method.as_str(),
                "path": request.path,
                "form": form,
                "bodyLength": request.body.as_ref().map_or(0, bytes::Bytes::len),
            }))
            .expect("JSON serialization of echo response cannot fail");

            json_response(json)
        })
    }
}
