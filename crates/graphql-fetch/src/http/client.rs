//! reqwest-backed transport.

use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;

use crate::error::{FetchError, Result};
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Configuration for the HTTP client.
///
/// The overall request deadline is owned by the executor, so there is no
/// request timeout here.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: Some(format!("graphql-fetch/{}", env!("CARGO_PKG_VERSION"))),
            proxy: None,
        }
    }
}

/// Builder for creating an HTTP client with custom configuration.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Build the HTTP client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = reqwest::Client::builder();

        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| FetchError::Config(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(HttpClient {
            inner: Arc::new(HttpClientInner {
                client,
                config: self.config,
            }),
        })
    }
}

struct HttpClientInner {
    client: reqwest::Client,
    config: HttpClientConfig,
}

/// The default [`Transport`], backed by `reqwest`.
///
/// Cheaply cloneable; clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

impl HttpClient {
    /// Create a client with default configuration.
    pub fn try_new() -> Result<Self> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Get the client's configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.inner.config
    }
}

impl Transport for HttpClient {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        tracing::debug!(target: "graphql_fetch::http", "POST {}", request.url);

        let response = self
            .inner
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::trace!(target: "graphql_fetch::http", "HTTP {} ({} bytes)", status, body.len());
        Ok(TransportResponse { status, body })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.inner.config)
            .finish()
    }
}
