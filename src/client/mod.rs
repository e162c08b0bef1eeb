use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub mod http;

#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Issues a single GET and hands back the raw response body.
///
/// The body is returned whatever the HTTP status code; devices answer
/// with plain text or JSON and callers decide what counts as success.
pub trait Transport: Send + Sync + 'static {
    fn get(
        &self,
        url: String,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}
