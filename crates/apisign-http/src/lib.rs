//! HTTP service layer for apisign.
//!
//! Provides a hyper [`Service`](hyper::service::Service) that turns every
//! inbound request into a [`RequestDescriptor`](apisign_auth::RequestDescriptor),
//! verifies it and dispatches it to a [`SignedHandler`] only when verification
//! succeeds:
//!
//! - **Handler trait**: the boundary between HTTP and business logic
//! - **Service**: health probes, body collection, verification, dispatch
//! - **Response helpers**: JSON error bodies and error-kind to status mapping
//! - **Server**: accept loop with graceful shutdown

pub mod dispatch;
pub mod response;
pub mod server;
pub mod service;

pub use dispatch::{EchoHandler, HandlerFuture, SignedHandler};
pub use response::{GatewayBody, status_for};
pub use server::serve;
pub use service::SignedHttpService;
