//! Outbound HTTP gateway: every call passes through the middleware chain
//! (bearer token injection) before reaching the transport.

pub mod client;
pub mod error;
pub mod middleware;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, GENERIC_ERROR_MESSAGE};
pub use middleware::{BearerAuth, RequestMiddleware};
pub use transport::{ApiRequest, ApiResponse, Body, HttpTransport, Transport};
