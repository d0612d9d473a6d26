//! Per-call request options.

use crate::retry::{retry_if, retry_if_async, RetryPredicate};
use crate::{Error, Result};
use http::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Default attempt ceiling for a single call.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// A request body.
///
/// Structured bodies are serialized to JSON before they are handed to the
/// transport; text bodies are sent verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A raw text body.
    Text(String),
    /// A structured body.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Serializes `value` into a structured body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be represented
    /// as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    /// Returns `true` for bodies that are not sent at all: empty text, `null`,
    /// `false`, `0` and the empty JSON string.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Text(text) => text.is_empty(),
            RequestBody::Json(serde_json::Value::Null) => true,
            RequestBody::Json(serde_json::Value::Bool(b)) => !b,
            RequestBody::Json(serde_json::Value::Number(n)) => n.as_f64() == Some(0.0),
            RequestBody::Json(serde_json::Value::String(s)) => s.is_empty(),
            RequestBody::Json(_) => false,
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

/// Options for a single call.
///
/// Options are plain values: cloning them shares the retry predicate but
/// copies everything else.
///
/// # Examples
///
/// ```
/// use curlew::RequestOptions;
/// use http::Method;
///
/// let options = RequestOptions::new()
///     .with_method(Method::POST)
///     .with_header("Accept", "application/json")
///     .with_body(serde_json::json!({ "name": "Alice" }))
///     .with_max_retries(5)
///     .with_retry_if(|stderr| stderr.contains("Connection refused"));
///
/// assert_eq!(options.max_retries, 5);
/// assert!(options.should_retry.is_some());
/// ```
#[derive(Clone)]
pub struct RequestOptions {
    /// The HTTP method, GET by default.
    pub method: Method,

    /// Request headers, sent in key order.
    pub headers: BTreeMap<String, String>,

    /// The request body, if any.
    pub body: Option<RequestBody>,

    /// Proxy address handed to the transport.
    pub proxy: Option<String>,

    /// Decides whether a failed attempt is retried. Without one, a call makes
    /// exactly one attempt.
    pub should_retry: Option<Arc<dyn RetryPredicate>>,

    /// Maximum number of attempts for the call.
    pub max_retries: usize,
}

impl RequestOptions {
    /// Creates options for a plain GET with no headers and no body.
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            headers: BTreeMap::new(),
            body: None,
            proxy: None,
            should_retry: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a header, replacing any previous value under the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds multiple headers.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` and sets it as a structured body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be represented
    /// as JSON.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Some(RequestBody::json(value)?);
        Ok(self)
    }

    /// Routes the request through a proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets the attempt ceiling.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the retry predicate.
    pub fn with_retry_predicate(mut self, predicate: Arc<dyn RetryPredicate>) -> Self {
        self.should_retry = Some(predicate);
        self
    }

    /// Retries failed attempts whose stderr text satisfies `f`.
    pub fn with_retry_if<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.with_retry_predicate(Arc::new(retry_if(f)))
    }

    /// Retries failed attempts whose stderr text satisfies the async check `f`.
    pub fn with_retry_if_async<F, Fut>(self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.with_retry_predicate(Arc::new(retry_if_async(f)))
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("proxy", &self.proxy)
            .field(
                "should_retry",
                &self.should_retry.as_ref().map(|_| "<predicate>"),
            )
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = RequestOptions::default();
        assert_eq!(options.method, Method::GET);
        assert_eq!(options.max_retries, 3);
        assert!(options.headers.is_empty());
        assert!(options.body.is_none());
        assert!(options.should_retry.is_none());
    }

    #[test]
    fn test_empty_bodies() {
        assert!(RequestBody::from("").is_empty());
        assert!(RequestBody::Json(json!(null)).is_empty());
        assert!(RequestBody::Json(json!(false)).is_empty());
        assert!(RequestBody::Json(json!(0)).is_empty());
        assert!(RequestBody::Json(json!("")).is_empty());

        assert!(!RequestBody::from("x").is_empty());
        assert!(!RequestBody::Json(json!({})).is_empty());
        assert!(!RequestBody::Json(json!([])).is_empty());
        assert!(!RequestBody::Json(json!(true)).is_empty());
        assert!(!RequestBody::Json(json!(0.5)).is_empty());
    }

    #[test]
    fn test_with_json_serializes_struct() {
        #[derive(Serialize)]
        struct NewUser<'a> {
            name: &'a str,
            tags: Vec<&'a str>,
        }

        let options = RequestOptions::new()
            .with_json(&NewUser {
                name: "Alice",
                tags: vec!["admin"],
            })
            .unwrap();

        assert_eq!(
            options.body,
            Some(RequestBody::Json(json!({ "name": "Alice", "tags": ["admin"] })))
        );
    }

    #[test]
    fn test_debug_hides_predicate() {
        let options = RequestOptions::new().with_retry_if(|_| true);
        let text = format!("{:?}", options);
        assert!(text.contains("<predicate>"));
    }
}
