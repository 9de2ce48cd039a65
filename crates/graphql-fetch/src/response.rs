//! GraphQL response types.
//!
//! [`RawResponse`] is the wire shape `{data?, errors?, extensions?}`.
//! [`Response`] is the normalized two-field result every call resolves to.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

use crate::error::{FetchError, Result};

/// A GraphQL error returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// The error message.
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub locations: Vec<GraphQLLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                match segment {
                    PathSegment::Field(name) if i > 0 => write!(f, ".{}", name)?,
                    PathSegment::Field(name) => write!(f, "{}", name)?,
                    PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphQLError {}

/// A location in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// An array index.
    Index(usize),
}

/// How the typed result is taken from the response's `data` object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DataSelector {
    /// The first entry of `data`, in the order the server sent it.
    #[default]
    FirstField,
    /// The named top-level field of `data`.
    Field(String),
    /// The whole `data` value.
    Whole,
}

/// What to do when a response has no errors and no usable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataPolicy {
    /// Resolve with neither data nor error.
    #[default]
    Empty,
    /// Resolve with a [`FetchError::MissingData`] error.
    Error,
}

/// A GraphQL response as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// The data returned by the operation.
    #[serde(default)]
    pub data: Option<Value>,

    /// Errors that occurred during execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub errors: Vec<GraphQLError>,

    /// Additional response metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl RawResponse {
    /// Check if the response contains errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the first error, if any.
    pub fn first_error(&self) -> Option<&GraphQLError> {
        self.errors.first()
    }

    /// Get all errors as a combined message.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(
                self.errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
    }

    /// Select the result value from `data`.
    ///
    /// Returns `Err(FetchError::GraphQL)` with the first error's message if
    /// the response carries errors. A selected JSON `null` is `Ok(None)`.
    /// Missing data is resolved according to `policy`.
    pub fn select(
        &self,
        selector: &DataSelector,
        policy: MissingDataPolicy,
    ) -> Result<Option<&Value>> {
        if let Some(error) = self.first_error() {
            return Err(FetchError::GraphQL(error.message.clone()));
        }

        let missing = |reason: String| match policy {
            MissingDataPolicy::Empty => Ok(None),
            MissingDataPolicy::Error => Err(FetchError::MissingData(reason)),
        };

        let data = match &self.data {
            None | Some(Value::Null) => return missing("response has no data".into()),
            Some(data) => data,
        };

        let selected = match (selector, data) {
            (DataSelector::Whole, data) => data,
            (DataSelector::FirstField, Value::Object(map)) => match map.values().next() {
                Some(value) => value,
                None => return missing("data object is empty".into()),
            },
            (DataSelector::Field(name), Value::Object(map)) => match map.get(name) {
                Some(value) => value,
                None => return missing(format!("field '{}' not found in data", name)),
            },
            (_, _) => return missing("data is not an object".into()),
        };

        Ok(match selected {
            Value::Null => None,
            value => Some(value),
        })
    }

    /// Select and deserialize the result value.
    pub fn into_data<T: DeserializeOwned>(
        self,
        selector: &DataSelector,
        policy: MissingDataPolicy,
    ) -> Result<Option<T>> {
        match self.select(selector, policy)? {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| FetchError::Json(format!("Failed to deserialize GraphQL data: {}", e))),
            None => Ok(None),
        }
    }
}

/// The normalized result of a GraphQL call.
///
/// At most one of `data` and `error` is set. Both are `None` only for a
/// response that had no errors and no usable data under
/// [`MissingDataPolicy::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    /// The selected result.
    pub data: Option<T>,
    /// The failure description.
    pub error: Option<String>,
}

impl<T> Response<T> {
    /// A successful response.
    pub fn ok(data: Option<T>) -> Self {
        Self { data, error: None }
    }

    /// A failed response.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    /// Check if the call failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Check if the call produced data.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    /// Convert into a `Result`, treating the error string as the failure.
    pub fn into_result(self) -> std::result::Result<Option<T>, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl<T> From<Result<Option<T>>> for Response<T> {
    fn from(result: Result<Option<T>>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
