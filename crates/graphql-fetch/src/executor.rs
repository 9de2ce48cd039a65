//! The request executor.
//!
//! Every call resolves to a [`Response`]: transport failures, aborts,
//! GraphQL errors and decoding failures are all folded into
//! [`Response::error`]. Failures are also logged through `tracing` and
//! published as [`Diagnostic`] values to anyone holding a receiver from
//! [`Executor::diagnostics`].
//!
//! A call is aborted when the caller's [`CancellationToken`] fires or the
//! timeout elapses, whichever happens first. Either way the call resolves
//! immediately with the abort error; the in-flight transport future is
//! dropped.

use std::sync::{Arc, OnceLock};

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::cancel::CancellationToken;
use crate::config::ExecutorConfig;
use crate::error::{FetchError, Result};
use crate::http::{HttpClient, HttpClientBuilder};
use crate::request::{GraphQLRequest, RequestOptions};
use crate::response::{MissingDataPolicy, RawResponse, Response};
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// A failed call, as published on the diagnostics channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Endpoint the call was sent to.
    pub endpoint: String,
    /// The failure placed in the response.
    pub error: FetchError,
    /// Number of GraphQL errors the server returned. Only the first one
    /// reaches the response.
    pub graphql_errors: usize,
}

/// Builder for an [`Executor`] over the default HTTP transport.
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    http_client: Option<HttpClient>,
    http_client_builder: Option<HttpClientBuilder>,
}

impl ExecutorBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
            http_client: None,
            http_client_builder: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the default timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a header sent with every call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.config.headers.extend(headers);
        self
    }

    /// Set how responses without errors or data resolve.
    pub fn missing_data(mut self, policy: MissingDataPolicy) -> Self {
        self.config.missing_data = policy;
        self
    }

    /// Use an existing HTTP client.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Use a custom HTTP client builder.
    pub fn http_client_builder(mut self, builder: HttpClientBuilder) -> Self {
        self.http_client_builder = Some(builder);
        self
    }

    /// Build the executor.
    pub fn build(self) -> Result<Executor> {
        let http_client = if let Some(client) = self.http_client {
            client
        } else if let Some(builder) = self.http_client_builder {
            builder.build()?
        } else {
            HttpClient::try_new()?
        };

        Executor::with_transport(http_client, self.config)
    }
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct ExecutorInner<T> {
    transport: T,
    config: ExecutorConfig,
    diagnostics: broadcast::Sender<Diagnostic>,
}

/// Executes GraphQL requests and normalizes their results.
///
/// Cheaply cloneable; clones share the transport and diagnostics channel.
/// Calls are independent and may run concurrently.
///
/// # Example
///
/// ```ignore
/// use graphql_fetch::{Executor, GraphQLRequest, RequestOptions};
///
/// let executor = Executor::builder()
///     .endpoint("https://api.example.com/graphql")
///     .build()?;
///
/// let request = GraphQLRequest::new("query($id: ID!) { user(id: $id) { name } }")
///     .variable("id", "42");
///
/// let response = executor
///     .execute::<User>(request, RequestOptions::new().field("user"))
///     .await;
///
/// match response.error {
///     Some(error) => eprintln!("lookup failed: {error}"),
///     None => println!("{:?}", response.data),
/// }
/// ```
pub struct Executor<T = HttpClient> {
    inner: Arc<ExecutorInner<T>>,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Executor<HttpClient> {
    /// Create an executor over the default HTTP transport and configuration.
    pub fn new() -> Result<Self> {
        ExecutorBuilder::new().build()
    }

    /// Create a builder for configuring an executor.
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }
}

impl<T: Transport> Executor<T> {
    /// Create an executor over a custom transport.
    pub fn with_transport(transport: T, config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        let (diagnostics, _) = broadcast::channel(config.diagnostics_capacity);
        Ok(Self {
            inner: Arc::new(ExecutorInner {
                transport,
                config,
                diagnostics,
            }),
        })
    }

    /// Get the executor's configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Subscribe to diagnostics for failed calls made after this point.
    pub fn diagnostics(&self) -> broadcast::Receiver<Diagnostic> {
        self.inner.diagnostics.subscribe()
    }

    /// Execute a request and normalize the result.
    ///
    /// Never fails: every failure is reported through [`Response::error`].
    /// The typed result is chosen from `data` by [`RequestOptions::selector`].
    pub async fn execute<D: DeserializeOwned>(
        &self,
        request: GraphQLRequest,
        options: RequestOptions,
    ) -> Response<D> {
        let endpoint = self.endpoint_for(&options).to_string();

        let (result, graphql_errors) = match self.execute_raw(request, &options).await {
            Ok(raw) => {
                let count = raw.errors.len();
                (raw.into_data(&options.selector, self.inner.config.missing_data), count)
            }
            Err(err) => (Err(err), 0),
        };

        if let Err(ref error) = result {
            self.report(Diagnostic {
                endpoint,
                error: error.clone(),
                graphql_errors,
            });
        }

        result.into()
    }

    /// Execute a request and return the server's response as sent.
    ///
    /// GraphQL errors in the body are not treated as failures here. Transport
    /// failures, aborts and undecodable bodies are.
    pub async fn execute_raw(
        &self,
        request: GraphQLRequest,
        options: &RequestOptions,
    ) -> Result<RawResponse> {
        request.validate()?;

        let url = url::Url::parse(self.endpoint_for(options))?;
        let headers = self.merge_headers(&options.headers)?;
        let body = serde_json::to_vec(&request)?;
        let timeout = options.timeout.unwrap_or(self.inner.config.timeout);

        // Cancelled by the caller's token through linking, or by the deadline.
        let abort = options
            .cancellation
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        let transport_request = TransportRequest {
            url,
            headers,
            body: body.into(),
            cancellation: abort.clone(),
        };

        tracing::debug!(
            target: "graphql_fetch::executor",
            "Sending {} to {} (timeout {:?})",
            request.operation_type(),
            transport_request.url,
            timeout
        );

        let exchange = async {
            let response = self.inner.transport.send(transport_request).await?;
            decode(response)
        };
        // The abort token fires before the transport future is dropped.
        let caller_abort = wait_for(options.cancellation.as_ref());
        let deadline = async {
            tokio::time::sleep(timeout).await;
            abort.cancel();
        };

        tokio::select! {
            biased;

            _ = caller_abort => Err(FetchError::Cancelled),
            _ = deadline => Err(FetchError::Timeout),
            result = exchange => result,
        }
    }

    fn endpoint_for<'a>(&'a self, options: &'a RequestOptions) -> &'a str {
        options
            .endpoint
            .as_deref()
            .unwrap_or(&self.inner.config.endpoint)
    }

    fn merge_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let configured = self
            .inner
            .config
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()));
        let per_call = extra.iter().map(|(name, value)| (name.as_str(), value.as_str()));

        for (name, value) in configured.chain(per_call) {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            let value = HeaderValue::from_str(value)?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn report(&self, diagnostic: Diagnostic) {
        if diagnostic.graphql_errors > 1 {
            tracing::warn!(
                target: "graphql_fetch::executor",
                "GraphQL request to {} failed: {} ({} more errors)",
                diagnostic.endpoint,
                diagnostic.error,
                diagnostic.graphql_errors - 1
            );
        } else {
            tracing::warn!(
                target: "graphql_fetch::executor",
                "GraphQL request to {} failed: {}",
                diagnostic.endpoint,
                diagnostic.error
            );
        }
        // No receivers is not an error.
        let _ = self.inner.diagnostics.send(diagnostic);
    }
}

impl<T> std::fmt::Debug for Executor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.inner.config)
            .finish()
    }
}

async fn wait_for(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

fn decode(response: TransportResponse) -> Result<RawResponse> {
    let parsed = serde_json::from_slice::<RawResponse>(&response.body);
    match parsed {
        Ok(raw) if response.is_success() || raw.has_errors() => Ok(raw),
        Ok(_) => Err(status_error(&response)),
        Err(_) if !response.is_success() => Err(status_error(&response)),
        Err(err) => Err(err.into()),
    }
}

fn status_error(response: &TransportResponse) -> FetchError {
    let body = String::from_utf8_lossy(&response.body).trim().to_string();
    FetchError::HttpStatus {
        status: response.status,
        message: (!body.is_empty()).then_some(body),
    }
}

static DEFAULT_EXECUTOR: OnceLock<Result<Executor>> = OnceLock::new();

/// The process-wide executor used by [`execute`].
///
/// Created on first use with the default transport and configuration.
///
/// The underlying reqwest client pools connections on the tokio runtime that
/// first used them, so a pooled connection can go stale once that runtime
/// shuts down. Code that runs several runtimes, such as per-test runtimes,
/// or that embeds the client long-term should build its own [`Executor`].
pub fn default_executor() -> Result<&'static Executor> {
    DEFAULT_EXECUTOR
        .get_or_init(Executor::new)
        .as_ref()
        .map_err(Clone::clone)
}

/// Execute a request on the [`default_executor`].
///
/// # Example
///
/// ```ignore
/// let response = graphql_fetch::execute::<i64>(
///     GraphQLRequest::new("{ userCount }"),
///     RequestOptions::new(),
/// )
/// .await;
/// ```
pub async fn execute<D: DeserializeOwned>(
    request: GraphQLRequest,
    options: RequestOptions,
) -> Response<D> {
    match default_executor() {
        Ok(executor) => executor.execute(request, options).await,
        Err(err) => {
            tracing::warn!(target: "graphql_fetch::executor", "No default executor: {}", err);
            Response::failed(err.to_string())
        }
    }
}
