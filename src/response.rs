//! Parsed responses.
//!
//! The [`Response`] type carries the status code, headers and body decoded
//! from curl's raw output, plus some metadata about how the call went.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// The header name whose repeated occurrences are all kept.
pub(crate) const SET_COOKIE: &str = "set-cookie";

/// Response headers keyed by lower-cased name.
///
/// Repeating a header overwrites its earlier value, except for `set-cookie`,
/// whose values are all kept in the order they were received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    fields: BTreeMap<String, String>,
    set_cookie: Option<Vec<String>>,
}

impl ResponseHeaders {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a header. `name` is lower-cased first.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        if name == SET_COOKIE {
            self.set_cookie
                .get_or_insert_with(Vec::new)
                .push(value.into());
        } else {
            self.fields.insert(name, value.into());
        }
    }

    /// Returns a scalar header value. Lookup is case-insensitive.
    ///
    /// `set-cookie` is never returned here; use [`ResponseHeaders::set_cookie`].
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns every `set-cookie` value in order, or `None` if the response
    /// set no cookies.
    pub fn set_cookie(&self) -> Option<&[String]> {
        self.set_cookie.as_deref()
    }

    /// Returns `true` if a header with this name was received.
    pub fn contains(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if name == SET_COOKIE {
            self.set_cookie.is_some()
        } else {
            self.fields.contains_key(&name)
        }
    }

    /// Iterates over the scalar headers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct header names, counting `set-cookie` once.
    pub fn len(&self) -> usize {
        self.fields.len() + usize::from(self.set_cookie.is_some())
    }

    /// Returns `true` if no headers were received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An undecoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body of a response whose content type starts with
    /// `application/json`.
    Json(serde_json::Value),
    /// Any other body, verbatim.
    Text(String),
}

impl ResponseBody {
    /// Returns the JSON value, if this body was JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Returns the text, if this body was not JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }
}

/// A response obtained through the transport.
///
/// A response is returned whatever its HTTP status: a 404 is a successful
/// call as far as the transport is concerned.
///
/// # Type Parameters
///
/// * `T` - The body type, [`ResponseBody`] until converted with
///   [`Response::deserialize`]
///
/// # Examples
///
/// ```no_run
/// use curlew::RequestOptions;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), curlew::Error> {
/// let response = curlew::request("https://api.example.com/users/1", RequestOptions::new()).await?;
/// println!("Status: {}", response.status_code);
/// println!("Cookies: {:?}", response.headers.set_cookie());
///
/// let user = response.deserialize::<User>()?;
/// println!("User {}: {}", user.body.id, user.body.name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T = ResponseBody> {
    /// The status code, or 0 if the status line could not be read.
    pub status_code: u16,

    /// The response headers.
    pub headers: ResponseHeaders,

    /// The response body.
    pub body: T,

    /// The number of attempts it took to get this response.
    pub attempts: usize,

    /// Time from the first attempt until this response was parsed.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response` for a single attempt with no recorded latency.
    pub fn new(status_code: u16, headers: ResponseHeaders, body: T) -> Self {
        Self {
            status_code,
            headers,
            body,
            attempts: 1,
            latency: Duration::ZERO,
        }
    }

    /// Maps the body to a different type, keeping everything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use curlew::{Response, ResponseHeaders};
    ///
    /// let response = Response::new(200, ResponseHeaders::new(), 42);
    /// let response = response.map(|n| n.to_string());
    /// assert_eq!(response.body, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            status_code: self.status_code,
            headers: self.headers,
            body: f(self.body),
            attempts: self.attempts,
            latency: self.latency,
        }
    }

    /// Returns `true` if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Returns `true` if the call took more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a scalar header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use curlew::{Response, ResponseHeaders};
    ///
    /// let mut headers = ResponseHeaders::new();
    /// headers.insert("Content-Type", "text/plain");
    ///
    /// let response = Response::new(200, headers, ());
    /// assert_eq!(response.header("content-type"), Some("text/plain"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

impl Response<ResponseBody> {
    /// Converts the body into `T`.
    ///
    /// JSON bodies are converted directly; text bodies are parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] if the body does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<Response<T>> {
        let status = self.status_code;
        let converted = match &self.body {
            ResponseBody::Json(value) => T::deserialize(value).map_err(|e| (value.to_string(), e)),
            ResponseBody::Text(text) => serde_json::from_str(text).map_err(|e| (text.clone(), e)),
        };

        match converted {
            Ok(body) => Ok(self.map(|_| body)),
            Err((raw_response, e)) => {
                tracing::error!(
                    error = %e,
                    status = status,
                    "Failed to convert response body"
                );
                Err(Error::DeserializationFailed {
                    raw_response,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    /// Returns the body as text, re-serializing JSON bodies.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
        }
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.body
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.body
    }
}
