//! A small GraphQL-over-HTTP client.
//!
//! Every call POSTs `{query, variables}` to an endpoint, applies a timeout and
//! an optional caller-controlled cancellation token, and resolves to a
//! [`Response`] holding either the selected `data` or an `error` string. Calls
//! never return `Err` and never panic on network or server failures.
//!
//! # Quick start
//!
//! ```ignore
//! use graphql_fetch::{GraphQLRequest, RequestOptions};
//!
//! // Uses http://localhost:8000/graphql and a 3 second timeout.
//! let response = graphql_fetch::execute::<u64>(
//!     GraphQLRequest::new("{ userCount }"),
//!     RequestOptions::new(),
//! )
//! .await;
//!
//! if let Some(error) = response.error {
//!     eprintln!("query failed: {error}");
//! }
//! ```
//!
//! # Configured executor
//!
//! ```ignore
//! use std::time::Duration;
//! use graphql_fetch::{CancellationToken, Executor, GraphQLRequest, RequestOptions};
//!
//! let executor = Executor::builder()
//!     .endpoint("https://api.example.com/graphql")
//!     .timeout(Duration::from_secs(5))
//!     .header("X-Client-Name", "inventory")
//!     .build()?;
//!
//! let token = CancellationToken::new();
//! let request = GraphQLRequest::new("query($id: ID!) { user(id: $id) { name } }")
//!     .variable("id", "42");
//!
//! let response = executor
//!     .execute::<User>(
//!         request,
//!         RequestOptions::new().field("user").cancellation(token.clone()),
//!     )
//!     .await;
//! ```
//!
//! # Selecting data
//!
//! By default the first entry of the `data` object (in the order the server
//! sent it) becomes the result. Use [`RequestOptions::field`] to name the
//! field explicitly, or [`DataSelector::Whole`] to take all of `data`.
//!
//! # Diagnostics
//!
//! Failed calls are logged with `tracing` under the `graphql_fetch` targets
//! and published to [`Executor::diagnostics`] receivers.

mod cancel;
mod config;
mod error;
mod executor;
pub mod http;
mod request;
mod response;
mod transport;

pub use cancel::CancellationToken;
pub use config::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, ExecutorConfig, MAX_DIAGNOSTICS_CAPACITY};
pub use error::{FetchError, Result};
pub use executor::{Diagnostic, Executor, ExecutorBuilder, default_executor, execute};
pub use request::{GraphQLRequest, OperationType, RequestOptions};
pub use response::{
    DataSelector, GraphQLError, GraphQLLocation, MissingDataPolicy, PathSegment, RawResponse,
    Response,
};
pub use transport::{Transport, TransportRequest, TransportResponse};
