//! Outbound HTTP transport for notifications

use std::fmt;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Synchronous HTTP POST client
///
/// Implementations send `Content-Type: application/json` and do not verify
/// the server certificate. The device has no trust store or clock to check
/// one against, and the endpoint is authenticated by the token in the body.
pub trait HttpClient {
    type Error: fmt::Debug;

    /// POST `body` to `url` and wait for the response
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, Self::Error>;
}
