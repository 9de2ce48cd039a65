//! HTTP transport for GraphQL requests.
//!
//! [`HttpClient`] implements [`Transport`](crate::Transport) on top of
//! `reqwest`. It only deals with connection concerns; headers, deadlines and
//! cancellation are applied by the executor.
//!
//! # Example
//!
//! ```ignore
//! use graphql_fetch::http::HttpClient;
//! use graphql_fetch::{Executor, ExecutorConfig};
//!
//! let client = HttpClient::builder()
//!     .user_agent("inventory/1.0")
//!     .proxy("http://proxy.internal:3128")
//!     .build()?;
//!
//! let executor = Executor::with_transport(client, ExecutorConfig::default())?;
//! ```

mod client;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
