//! GraphQL request types.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cancel::CancellationToken;
use crate::error::{FetchError, Result};
use crate::response::DataSelector;

/// A GraphQL operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A query operation (read-only).
    #[default]
    Query,
    /// A mutation operation (modifies data).
    Mutation,
    /// A subscription operation. Not executed over HTTP by this crate.
    Subscription,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
            Self::Subscription => write!(f, "subscription"),
        }
    }
}

/// A GraphQL request payload.
///
/// Serializes to the GraphQL-over-HTTP body `{query, variables}`, adding
/// `operationName` and `extensions` only when they are set. `variables` is
/// always present and defaults to an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLRequest {
    /// The GraphQL document.
    pub query: String,

    /// Variables for the operation.
    #[serde(default)]
    pub variables: Map<String, Value>,

    /// Operation name (for documents with multiple operations).
    #[serde(skip_serializing_if = "Option::is_none", rename = "operationName")]
    pub operation_name: Option<String>,

    /// Extensions (implementation-specific metadata).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLRequest {
    /// Create a new request from a query or mutation document.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let request = GraphQLRequest::new(r#"
    ///     query GetUser($id: ID!) {
    ///         user(id: $id) { id name }
    ///     }
    /// "#)
    /// .variable("id", "123");
    /// ```
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
            extensions: None,
        }
    }

    /// Set a variable value.
    ///
    /// Values that fail to serialize are skipped with a warning.
    pub fn variable(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.variables.insert(name, value);
            }
            Err(e) => {
                tracing::warn!(target: "graphql_fetch::request", "Skipping variable '{}': {}", name, e);
            }
        }
        self
    }

    /// Replace all variables with the fields of a serializable object.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let request = GraphQLRequest::new("...")
    ///     .variables(serde_json::json!({ "id": "123", "limit": 10 }))?;
    /// ```
    pub fn variables(mut self, variables: impl Serialize) -> Result<Self> {
        match serde_json::to_value(variables)? {
            Value::Object(map) => self.variables = map,
            Value::Null => self.variables = Map::new(),
            other => {
                return Err(FetchError::Json(format!(
                    "variables must serialize to an object, got {}",
                    json_kind(&other)
                )));
            }
        }
        Ok(self)
    }

    /// Set variables from a HashMap.
    pub fn variables_map(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = variables.into_iter().collect();
        self
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set extensions.
    ///
    /// A value that fails to serialize is skipped with a warning and the
    /// previous extensions are kept.
    pub fn extensions(mut self, extensions: impl Serialize) -> Self {
        match serde_json::to_value(extensions) {
            Ok(value) => self.extensions = Some(value),
            Err(e) => {
                tracing::warn!(target: "graphql_fetch::request", "Skipping extensions: {}", e);
            }
        }
        self
    }

    /// Infer the operation type from the document.
    ///
    /// Looks at the first top-level operation definition, skipping comments,
    /// string literals and fragment definitions. A shorthand `{ ... }`
    /// document is a query.
    pub fn operation_type(&self) -> OperationType {
        infer_operation_type(&self.query)
    }

    /// Check that the request can be sent.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(FetchError::EmptyQuery);
        }
        if self.operation_type() == OperationType::Subscription {
            return Err(FetchError::UnsupportedOperation(
                "subscriptions are not supported over HTTP".into(),
            ));
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn infer_operation_type(document: &str) -> OperationType {
    let mut chars = document.chars().peekable();
    let mut word = String::new();
    // Brace depth inside a fragment definition; `None` at the top level.
    let mut fragment_depth: Option<usize> = None;

    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            if chars.peek().is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_') {
                continue;
            }
            if fragment_depth.is_none() {
                match word.as_str() {
                    "query" => return OperationType::Query,
                    "mutation" => return OperationType::Mutation,
                    "subscription" => return OperationType::Subscription,
                    "fragment" => fragment_depth = Some(0),
                    _ => {}
                }
            }
            word.clear();
            continue;
        }

        match c {
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => skip_string(&mut chars),
            '{' => match fragment_depth.as_mut() {
                Some(depth) => *depth += 1,
                None => return OperationType::Query,
            },
            '}' => {
                if let Some(depth) = fragment_depth {
                    fragment_depth = match depth {
                        0 | 1 => None,
                        _ => Some(depth - 1),
                    };
                }
            }
            _ => {}
        }
    }

    OperationType::Query
}

/// Consume a string literal whose opening quote was already read.
fn skip_string(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    if chars.peek() == Some(&'"') {
        chars.next();
        if chars.peek() != Some(&'"') {
            // Empty string `""`.
            return;
        }
        chars.next();
        // Block string: runs until the next unescaped `"""`.
        let mut quotes = 0;
        let mut escaped = false;
        for c in chars.by_ref() {
            match c {
                '"' if !escaped => {
                    quotes += 1;
                    if quotes == 3 {
                        return;
                    }
                }
                '\\' => {
                    escaped = !escaped;
                    quotes = 0;
                }
                _ => {
                    escaped = false;
                    quotes = 0;
                }
            }
        }
        return;
    }

    let mut escaped = false;
    for c in chars.by_ref() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => break,
            '\n' => break,
            _ => escaped = false,
        }
    }
}

/// Per-call options for [`Executor::execute`](crate::Executor::execute).
///
/// Every field is optional and overrides the executor's configuration for a
/// single call. Header precedence, lowest to highest: the built-in
/// `Content-Type`/`Accept` defaults, [`ExecutorConfig::headers`](crate::ExecutorConfig::headers),
/// then [`RequestOptions::headers`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Endpoint override.
    pub endpoint: Option<String>,
    /// Extra headers for this call.
    pub headers: Vec<(String, String)>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Caller-controlled abort signal.
    pub cancellation: Option<CancellationToken>,
    /// How the typed result is taken from `data`.
    pub selector: DataSelector,
}

impl RequestOptions {
    /// Options with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send this call to a different endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a header to this call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Override the timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort the call when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Take the result from the named top-level field of `data`.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.selector = DataSelector::Field(name.into());
        self
    }

    /// Set the data selector.
    pub fn selector(mut self, selector: DataSelector) -> Self {
        self.selector = selector;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_empty_variables() {
        let request = GraphQLRequest::new("{ users { id } }");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"query": "{ users { id } }", "variables": {}}));
    }

    #[test]
    fn test_variables() {
        let request = GraphQLRequest::new("query($id: ID!) { user(id: $id) { name } }")
            .variable("id", "123")
            .variable("limit", 10);

        assert_eq!(request.variables["id"], "123");
        assert_eq!(request.variables["limit"], 10);
    }

    #[test]
    fn test_variables_from_object() {
        let request = GraphQLRequest::new("{ a }")
            .variables(json!({"first": 5}))
            .unwrap();
        assert_eq!(request.variables["first"], 5);

        let err = GraphQLRequest::new("{ a }").variables(json!([1, 2])).unwrap_err();
        assert!(matches!(err, FetchError::Json(_)));
    }

    #[test]
    fn test_operation_name_serialized() {
        let request = GraphQLRequest::new("query GetUser { user { id } }").operation_name("GetUser");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["operationName"], "GetUser");
        assert!(body.get("extensions").is_none());
    }

    #[test]
    fn test_unserializable_extensions_are_skipped() {
        let request = GraphQLRequest::new("{ a }").extensions(json!({"persistedQuery": {"version": 1}}));
        let bad: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let request = request.extensions(bad);
        assert_eq!(
            request.extensions,
            Some(json!({"persistedQuery": {"version": 1}}))
        );

        let unset = GraphQLRequest::new("{ a }").extensions(HashMap::from([((1u8, 2u8), 3u8)]));
        assert!(unset.extensions.is_none());
    }

    #[test]
    fn test_infer_operation_type() {
        let cases = [
            ("{ users }", OperationType::Query),
            ("query { users }", OperationType::Query),
            ("  mutation Create { create }", OperationType::Mutation),
            ("subscription { events }", OperationType::Subscription),
            ("# mutation in a comment\nquery { a }", OperationType::Query),
            (
                "fragment F on User { mutation }\nmutation M { m { ...F } }",
                OperationType::Mutation,
            ),
            ("query { search(text: \"mutation {\") { id } }", OperationType::Query),
            (
                "fragment F on U { a(s: \"}\") }\nsubscription S { events { ...F } }",
                OperationType::Subscription,
            ),
            (
                "fragment F on U { a(s: \"\"\"say \"}\" here\"\"\") }\nmutation M { m }",
                OperationType::Mutation,
            ),
            ("fragment F on U { a { b } }\n{ c { ...F } }", OperationType::Query),
        ];
        for (document, expected) in cases {
            assert_eq!(
                GraphQLRequest::new(document).operation_type(),
                expected,
                "document: {document}"
            );
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            GraphQLRequest::new("   ").validate(),
            Err(FetchError::EmptyQuery)
        );
        assert!(matches!(
            GraphQLRequest::new("subscription { events }").validate(),
            Err(FetchError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            GraphQLRequest::new("fragment F on U { a(s: \"}\") }\nsubscription S { events { ...F } }")
                .validate(),
            Err(FetchError::UnsupportedOperation(_))
        ));
        assert!(GraphQLRequest::new("{ a }").validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let token = CancellationToken::new();
        let options = RequestOptions::new()
            .endpoint("http://example.com/graphql")
            .header("X-Trace", "abc")
            .timeout(Duration::from_millis(500))
            .cancellation(token)
            .field("user");

        assert_eq!(options.endpoint.as_deref(), Some("http://example.com/graphql"));
        assert_eq!(options.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
        assert_eq!(options.timeout, Some(Duration::from_millis(500)));
        assert!(options.cancellation.is_some());
        assert_eq!(options.selector, DataSelector::Field("user".into()));
    }
}
