//! JSON responses and error-kind to status mapping.

use apisign_auth::SignError;
use bytes::Bytes;
use http_body_util::Full;

/// Response body used by the gateway.
pub type GatewayBody = Full<Bytes>;

/// Content type of every JSON response.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP status for a verification failure.
///
/// Malformed requests map to 400, identity, signature and freshness failures
/// to 401, replays to 409 and nonce store outages to 503.
#[must_use]
pub fn status_for(error: &SignError) -> http::StatusCode {
    match error {
        SignError::NoQueryParam
        | SignError::NoTimestamp
        | SignError::InvalidTimestamp(_)
        | SignError::NonceTooShort(_)
        | SignError::NonceTooLong(_) => http::StatusCode::BAD_REQUEST,
        SignError::NoAppKey
        | SignError::WrongAppKey(_)
        | SignError::FutureTimestamp(_)
        | SignError::TsExpired(_)
        | SignError::NoSignature
        | SignError::WrongSign => http::StatusCode::UNAUTHORIZED,
        SignError::NonceExist => http::StatusCode::CONFLICT,
        SignError::CheckNonce(_) => http::StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Serialize an error as `{"code": ..., "message": ...}`.
#[must_use]
pub fn error_to_json(code: &str, message: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "code": code,
        "message": message,
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Build a JSON error response.
#[must_use]
pub fn error_response(
    status: http::StatusCode,
    code: &str,
    message: &str,
    request_id: &str,
) -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(Full::new(Bytes::from(error_to_json(code, message))))
        .expect("valid error response")
}

/// Convert a verification failure into a complete HTTP error response.
#[must_use]
pub fn sign_error_response(error: &SignError, request_id: &str) -> http::Response<GatewayBody> {
    error_response(status_for(error), error.code(), &error.to_string(), request_id)
}

/// Build a 200 response from JSON bytes.
#[must_use]
pub fn json_response(json: Vec<u8>) -> http::Response<GatewayBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(Full::new(Bytes::from(json)))
        .expect("valid JSON response")
}
