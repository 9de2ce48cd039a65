//! The transport seam between the executor and the network.
//!
//! The [`Executor`](crate::Executor) builds a [`TransportRequest`] and hands it
//! to a [`Transport`]. The default transport is the reqwest-backed
//! [`HttpClient`](crate::http::HttpClient); tests and embedders can plug in
//! their own.
//!
//! Aborting is done by dropping the future returned from
//! [`Transport::send`]. Before the drop, the executor cancels
//! [`TransportRequest::cancellation`], so transports that hold resources
//! outside the future can react to it as well.

use std::sync::Arc;

use bytes::Bytes;

use crate::cancel::CancellationToken;
use crate::error::Result;

/// A fully prepared HTTP POST.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Target URL.
    pub url: url::Url,
    /// Headers, already merged in precedence order.
    pub headers: http::HeaderMap,
    /// JSON-encoded GraphQL payload.
    pub body: Bytes,
    /// Cancelled by the executor on timeout or caller abort.
    pub cancellation: CancellationToken,
}

/// The status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a response from a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check if the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a GraphQL POST and returns the raw response.
pub trait Transport: Send + Sync + 'static {
    /// Execute the request.
    ///
    /// Implementations should map connection-level failures to
    /// [`FetchError::Connection`](crate::FetchError::Connection) and other
    /// transport failures to [`FetchError::Request`](crate::FetchError::Request).
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse>> + Send {
        (**self).send(request)
    }
}
